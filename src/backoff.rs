//! Bounded exponential backoff for polling
//!
//! Only the attestation lookup is polled. Transaction submissions are never
//! retried: resubmitting after partial success risks duplicate on-chain
//! effects.

use std::time::Duration;

/// Polling schedule
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Cap on a single delay
    pub max_backoff: Duration,
    /// Multiplier for exponential growth
    pub backoff_multiplier: f64,
    /// Total time budget across all delays
    pub max_wait: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            max_wait: Duration::from_secs(15 * 60),
        }
    }
}

impl BackoffConfig {
    /// Calculate backoff duration for a given attempt (0-indexed)
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_secs =
            self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        // Negative or NaN growth collapses to an immediate retry
        let capped = backoff_secs.min(self.max_backoff.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }

    /// Next delay after `attempt` failures, or `None` once sleeping it would
    /// exceed `max_wait` given `waited` so far
    pub fn next_delay(&self, attempt: u32, waited: Duration) -> Option<Duration> {
        let delay = self.backoff_for_attempt(attempt);
        if waited + delay > self.max_wait {
            return None;
        }
        Some(delay)
    }
}
