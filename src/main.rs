use std::sync::Arc;

use amb_relay::{
    AmbHelperAttestation, Config, EvmChainClient, Message, RelayEvent, RelayOrchestrator,
};
use eyre::WrapErr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    tracing::info!("Starting AMB relay");

    let config = Config::load()?;
    tracing::info!(
        source_chain_id = config.source.chain_id,
        destination_chain_id = config.destination.chain_id,
        relayer = %config.addresses.relayer,
        "Configuration loaded"
    );

    let source = EvmChainClient::new(config.source_client())?;
    let destination = EvmChainClient::new(config.destination_client())?;
    source
        .verify_chain_id()
        .await
        .wrap_err("Source RPC check failed")?;
    destination
        .verify_chain_id()
        .await
        .wrap_err("Destination RPC check failed")?;

    let attestation = AmbHelperAttestation::new(&config.amb_helper_rpc_url, config.amb_helper)?;

    let shutdown = CancellationToken::new();
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let orchestrator = RelayOrchestrator::new(
        Arc::new(source),
        Arc::new(destination),
        Arc::new(attestation),
        config.addresses.clone(),
    )
    .with_timeouts(config.timeouts)
    .with_backoff(config.attestation_backoff.clone())
    .with_observer(events_tx)
    .with_shutdown(shutdown.clone());

    tokio::spawn(log_progress(events_rx));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_token.cancel();
    });

    let route = orchestrator.addresses();
    let message = Message::vrf_request(route.destination_chain_id, route.consumer);
    let result = orchestrator.relay(message).await;

    tracing::debug!(metrics = %amb_relay::metrics::gather_text(), "Final metrics");

    let correlation_id = result?;
    tracing::info!(request_id = %correlation_id, "VRF request relayed");
    println!("{}", correlation_id);

    Ok(())
}

/// Mirror relay progress into the log
async fn log_progress(mut events: mpsc::UnboundedReceiver<RelayEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            RelayEvent::StateChanged { relay_id, from, to } => {
                tracing::info!(relay_id, ?from, ?to, "Relay progress");
            }
            RelayEvent::TransactionIncluded {
                relay_id,
                step,
                chain_id,
                tx_hash,
            } => {
                tracing::info!(relay_id, %step, chain_id, %tx_hash, "Transaction included");
            }
            RelayEvent::AttestationPending {
                relay_id,
                attempt,
                retry_in,
            } => {
                tracing::info!(relay_id, attempt, ?retry_in, "Waiting for attestation");
            }
        }
    }
}

/// Initialize tracing/logging with structured output
///
/// `LOG_FORMAT=json` switches to JSON lines.
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,amb_relay=debug"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, cancelling relay");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, cancelling relay");
        }
    }
}
