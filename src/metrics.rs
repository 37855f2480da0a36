//! Prometheus metrics for the AMB relay

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    pub static ref RELAYS_STARTED: Counter = register_counter!(
        "amb_relay_relays_started_total",
        "Total number of relay invocations started"
    ).unwrap();

    pub static ref RELAYS_COMPLETED: Counter = register_counter!(
        "amb_relay_relays_completed_total",
        "Total number of relays executed on both chains"
    ).unwrap();

    pub static ref RELAYS_FAILED: CounterVec = register_counter_vec!(
        "amb_relay_relays_failed_total",
        "Total number of failed relays by the step in progress",
        &["step"]
    ).unwrap();

    pub static ref ATTESTATION_POLLS: Counter = register_counter!(
        "amb_relay_attestation_polls_total",
        "Total number of attestation lookups"
    ).unwrap();

    pub static ref STEP_LATENCY: HistogramVec = register_histogram_vec!(
        "amb_relay_step_latency_seconds",
        "Time spent in each relay step",
        &["step"],
        vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 900.0]
    ).unwrap();
}

pub fn record_relay_started() {
    RELAYS_STARTED.inc();
}

pub fn record_relay_completed() {
    RELAYS_COMPLETED.inc();
}

pub fn record_relay_failed(step: &str) {
    RELAYS_FAILED.with_label_values(&[step]).inc();
}

pub fn record_attestation_poll() {
    ATTESTATION_POLLS.inc();
}

/// Record how long a step took
pub fn record_step_latency(step: &str, seconds: f64) {
    STEP_LATENCY.with_label_values(&[step]).observe(seconds);
}

/// Render all registered metrics in the Prometheus text format
pub fn gather_text() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&prometheus::gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
