//! Relay orchestrator
//!
//! Drives one message through dispatch, attestation, destination execution,
//! correlation extraction and source execution. Each step's on-chain effect
//! is a precondition for the next, so steps run strictly in order. Only the
//! attestation lookup is retried; every other failure is terminal for the
//! invocation and nothing is rolled back.
//!
//! ## Submodules
//!
//! - `state` - state machine and progress events
//! - `error` - failure taxonomy
//! - `correlation` - correlation id extraction

mod correlation;
mod error;
mod state;

pub use correlation::{extract_correlation_id, MESSAGE_DISPATCHED};
pub use error::{CorrelationError, FailureReason, RelayError};
pub use state::{FailureKind, RelayEvent, RelayState, RelayStep};

use alloy::primitives::{Address, Bytes};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::attestation::{AttestationError, AttestationService};
use crate::backoff::BackoffConfig;
use crate::chain::{ChainClient, ChainError};
use crate::config::{RelayAddresses, StepTimeouts};
use crate::encoding::{
    dispatch_call, encode_attestation_tuple, execute_messages_call, execute_signature_call,
};
use crate::metrics;
use crate::types::{Attestation, CorrelationId, DispatchReceipt, Message, Receipt};

/// Orchestrates relays between one source and one destination chain
///
/// Cheap to share: `relay` takes `&self` and keeps all per-invocation state
/// local, so independent messages can be relayed concurrently.
pub struct RelayOrchestrator {
    source: Arc<dyn ChainClient>,
    destination: Arc<dyn ChainClient>,
    attestation: Arc<dyn AttestationService>,
    addresses: RelayAddresses,
    timeouts: StepTimeouts,
    backoff: BackoffConfig,
    observer: Option<mpsc::UnboundedSender<RelayEvent>>,
    shutdown: CancellationToken,
    next_relay_id: AtomicU64,
}

impl RelayOrchestrator {
    pub fn new(
        source: Arc<dyn ChainClient>,
        destination: Arc<dyn ChainClient>,
        attestation: Arc<dyn AttestationService>,
        addresses: RelayAddresses,
    ) -> Self {
        Self {
            source,
            destination,
            attestation,
            addresses,
            timeouts: StepTimeouts::default(),
            backoff: BackoffConfig::default(),
            observer: None,
            shutdown: CancellationToken::new(),
            next_relay_id: AtomicU64::new(1),
        }
    }

    pub fn with_timeouts(mut self, timeouts: StepTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Send progress events to `observer`
    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<RelayEvent>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Use `shutdown` as the parent of every relay's cancellation token
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn addresses(&self) -> &RelayAddresses {
        &self.addresses
    }

    /// Cancelling this token cancels every in-flight relay
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Relay `message` and return the destination's correlation id
    pub async fn relay(&self, message: Message) -> Result<CorrelationId, RelayError> {
        self.relay_with_cancellation(message, self.shutdown.child_token())
            .await
    }

    /// Relay `message`, aborting at the next suspension point once `cancel`
    /// fires
    ///
    /// Transactions already submitted stay submitted.
    pub async fn relay_with_cancellation(
        &self,
        message: Message,
        cancel: CancellationToken,
    ) -> Result<CorrelationId, RelayError> {
        let relay_id = self.next_relay_id.fetch_add(1, Ordering::Relaxed);
        metrics::record_relay_started();
        info!(
            relay_id,
            destination_chain_id = message.destination_chain_id,
            to = %message.destination_address,
            "Starting relay"
        );

        let mut run = RelayRun::new(self, relay_id, cancel);
        let result = run.execute(message).await;

        match &result {
            Ok(correlation_id) => {
                metrics::record_relay_completed();
                info!(relay_id, correlation_id = %correlation_id, "Relay completed");
            }
            Err(e) => {
                metrics::record_relay_failed(e.step.as_str());
                warn!(relay_id, step = %e.step, error = %e.reason, "Relay failed");
            }
        }
        result
    }
}

/// State of a single relay invocation
struct RelayRun<'a> {
    orchestrator: &'a RelayOrchestrator,
    relay_id: u64,
    cancel: CancellationToken,
    state: RelayState,
    step_started: Instant,
}

impl<'a> RelayRun<'a> {
    fn new(orchestrator: &'a RelayOrchestrator, relay_id: u64, cancel: CancellationToken) -> Self {
        Self {
            orchestrator,
            relay_id,
            cancel,
            state: RelayState::Idle,
            step_started: Instant::now(),
        }
    }

    async fn execute(&mut self, message: Message) -> Result<CorrelationId, RelayError> {
        self.validate(&message)?;
        let dispatch = self.dispatch(message).await?;
        let attestation = self.await_attestation(&dispatch).await?;
        let destination_receipt = self.execute_destination(&attestation).await?;
        let correlation_id = self.extract_correlation(&destination_receipt)?;
        self.execute_source(&dispatch, correlation_id).await?;
        self.transition(RelayState::Completed);
        Ok(correlation_id)
    }

    // =========================================================================
    // Steps
    // =========================================================================

    fn validate(&mut self, message: &Message) -> Result<(), RelayError> {
        let orch = self.orchestrator;
        let addresses = &orch.addresses;

        let problem = if message.destination_chain_id != addresses.destination_chain_id {
            Some(format!(
                "message targets chain {}, route delivers to {}",
                message.destination_chain_id, addresses.destination_chain_id
            ))
        } else if orch.source.chain_id() != addresses.source_chain_id {
            Some(format!(
                "source client is on chain {}, route expects {}",
                orch.source.chain_id(),
                addresses.source_chain_id
            ))
        } else if orch.destination.chain_id() != addresses.destination_chain_id {
            Some(format!(
                "destination client is on chain {}, route expects {}",
                orch.destination.chain_id(),
                addresses.destination_chain_id
            ))
        } else if orch.source.signer_address() != addresses.relayer
            || orch.destination.signer_address() != addresses.relayer
        {
            Some(format!(
                "chain clients do not both sign as relayer {}",
                addresses.relayer
            ))
        } else {
            addresses.validate().err()
        };

        match problem {
            Some(reason) => Err(self.fail(FailureReason::InvalidRequest(reason))),
            None => Ok(()),
        }
    }

    async fn dispatch(&mut self, message: Message) -> Result<DispatchReceipt, RelayError> {
        let orch = self.orchestrator;
        let addresses = &orch.addresses;
        self.transition(RelayState::Dispatching);

        info!(relay_id = self.relay_id, "Dispatching message");
        let data = dispatch_call(&message, &addresses.message_relays, &addresses.adapters);
        let receipt = self
            .submit_and_wait(
                orch.source.as_ref(),
                addresses.source_dispatcher,
                data,
                orch.timeouts.dispatch,
                FailureReason::DispatchFailed,
            )
            .await?;

        Ok(DispatchReceipt {
            source_tx_hash: receipt.tx_hash,
            dispatched_message: message,
            adapter_address: addresses.destination_adapter,
            relayer_address: addresses.relayer,
        })
    }

    async fn await_attestation(
        &mut self,
        dispatch: &DispatchReceipt,
    ) -> Result<Attestation, RelayError> {
        let orch = self.orchestrator;
        self.transition(RelayState::AwaitingAttestation);

        let adapter = dispatch.adapter_address;
        let message = &dispatch.dispatched_message;
        let tuple = encode_attestation_tuple(message.destination_address, &message.payload);
        debug!(relay_id = self.relay_id, tuple = %tuple, "Requesting attestation");

        let mut attempt: u32 = 0;
        let mut waited = Duration::ZERO;

        loop {
            attempt += 1;
            metrics::record_attestation_poll();

            let outcome = self
                .cancellable(orch.attestation.get_signature(adapter, tuple.clone()))
                .await;
            let reason = match outcome {
                None => return Err(self.fail(FailureReason::Cancelled)),
                Some(Ok(attestation)) => return self.accept_attestation(attestation, adapter, &tuple),
                Some(Err(e @ AttestationError::Invalid(_))) => {
                    return Err(self.fail(FailureReason::AttestationInvalid(e)))
                }
                Some(Err(AttestationError::Unavailable(reason))) => reason,
            };

            let Some(delay) = orch.backoff.next_delay(attempt - 1, waited) else {
                return Err(self.fail(FailureReason::AttestationTimeout { attempts: attempt, waited }));
            };

            debug!(
                relay_id = self.relay_id,
                attempt,
                retry_in = ?delay,
                reason = %reason,
                "Attestation not available yet"
            );
            self.emit(RelayEvent::AttestationPending {
                relay_id: self.relay_id,
                attempt,
                retry_in: delay,
            });

            if self.cancellable(tokio::time::sleep(delay)).await.is_none() {
                return Err(self.fail(FailureReason::Cancelled));
            }
            waited += delay;
        }
    }

    /// Never forward an attestation issued for another key or a malformed one
    fn accept_attestation(
        &mut self,
        attestation: Attestation,
        adapter: Address,
        tuple: &Bytes,
    ) -> Result<Attestation, RelayError> {
        if !attestation.is_for(adapter, tuple) {
            return Err(self.fail(FailureReason::AttestationInvalid(AttestationError::Invalid(
                "attestation was issued for a different adapter or tuple".to_string(),
            ))));
        }
        let Some(count) = attestation.signature_count() else {
            return Err(self.fail(FailureReason::AttestationInvalid(AttestationError::Invalid(
                format!("malformed signature blob of {} bytes", attestation.signature.len()),
            ))));
        };

        info!(relay_id = self.relay_id, signatures = count, "Signature obtained");
        Ok(attestation)
    }

    async fn execute_destination(&mut self, attestation: &Attestation) -> Result<Receipt, RelayError> {
        let orch = self.orchestrator;
        self.transition(RelayState::ExecutingDestination);

        info!(relay_id = self.relay_id, adapter = %attestation.adapter, "Executing signature");
        let data = execute_signature_call(&attestation.encoded_tuple, &attestation.signature);
        self.submit_and_wait(
            orch.destination.as_ref(),
            attestation.adapter,
            data,
            orch.timeouts.destination,
            FailureReason::DestinationExecutionFailed,
        )
        .await
    }

    fn extract_correlation(&mut self, receipt: &Receipt) -> Result<CorrelationId, RelayError> {
        let orch = self.orchestrator;
        self.transition(RelayState::ExtractingCorrelation);

        let logs = orch.destination.find_event(receipt, MESSAGE_DISPATCHED);
        let correlation_id = extract_correlation_id(&logs)
            .map_err(|e| self.fail(FailureReason::CorrelationExtractionFailed(e)))?;

        info!(relay_id = self.relay_id, message_id = %correlation_id, "MessageId extracted");
        Ok(correlation_id)
    }

    async fn execute_source(
        &mut self,
        dispatch: &DispatchReceipt,
        correlation_id: CorrelationId,
    ) -> Result<Receipt, RelayError> {
        let orch = self.orchestrator;
        let addresses = &orch.addresses;
        self.transition(RelayState::ExecutingSource);

        info!(relay_id = self.relay_id, message_id = %correlation_id, "Executing message");
        let data = execute_messages_call(
            &dispatch.dispatched_message,
            correlation_id,
            dispatch.relayer_address,
            dispatch.adapter_address,
        );
        self.submit_and_wait(
            orch.source.as_ref(),
            addresses.source_executor,
            data,
            orch.timeouts.source,
            FailureReason::SourceExecutionFailed,
        )
        .await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Submit once and wait for inclusion; never resubmits
    async fn submit_and_wait(
        &mut self,
        client: &dyn ChainClient,
        to: Address,
        call_data: Bytes,
        timeout: Duration,
        on_error: fn(ChainError) -> FailureReason,
    ) -> Result<Receipt, RelayError> {
        let signer = self.orchestrator.addresses.relayer;

        let handle = match self.cancellable(client.submit(to, call_data, signer)).await {
            None => return Err(self.fail(FailureReason::Cancelled)),
            Some(Err(e)) => return Err(self.fail(on_error(e))),
            Some(Ok(handle)) => handle,
        };
        debug!(
            relay_id = self.relay_id,
            chain_id = handle.chain_id,
            tx_hash = %handle.tx_hash,
            "Transaction submitted, waiting for inclusion"
        );

        // Bound the wait even if the client ignores its deadline
        let wait = tokio::time::timeout(timeout, client.wait_included(&handle, timeout));
        let included = self.cancellable(wait).await.map(|outcome| {
            outcome.unwrap_or(Err(ChainError::Timeout {
                tx_hash: handle.tx_hash,
                after: timeout,
            }))
        });

        let receipt = match included {
            None => {
                warn!(
                    relay_id = self.relay_id,
                    tx_hash = %handle.tx_hash,
                    "Cancelled while waiting; transaction remains submitted"
                );
                return Err(self.fail(FailureReason::Cancelled));
            }
            Some(Err(e)) => {
                if e.is_post_submission() {
                    warn!(relay_id = self.relay_id, tx_hash = %handle.tx_hash, error = %e, "Transaction not confirmed");
                }
                return Err(self.fail(on_error(e)));
            }
            Some(Ok(receipt)) => receipt,
        };

        if let Some(step) = self.state.step() {
            self.emit(RelayEvent::TransactionIncluded {
                relay_id: self.relay_id,
                step,
                chain_id: handle.chain_id,
                tx_hash: receipt.tx_hash,
            });
        }
        Ok(receipt)
    }

    /// Race `fut` against cancellation; `None` means cancelled
    ///
    /// Cancellation is checked first, so a cancelled relay never starts
    /// another chain call.
    async fn cancellable<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }

    fn transition(&mut self, to: RelayState) {
        let from = self.state;
        debug_assert!(
            from.can_transition_to(&to),
            "illegal relay transition {:?} -> {:?}",
            from,
            to
        );

        if let Some(step) = from.step() {
            if step != RelayStep::Idle {
                metrics::record_step_latency(step.as_str(), self.step_started.elapsed().as_secs_f64());
            }
        }

        self.state = to;
        self.step_started = Instant::now();
        debug!(relay_id = self.relay_id, ?from, ?to, "Relay state changed");
        self.emit(RelayEvent::StateChanged {
            relay_id: self.relay_id,
            from,
            to,
        });
    }

    /// Move to `Failed` and build the caller-facing error
    fn fail(&mut self, reason: FailureReason) -> RelayError {
        let step = self.state.step().unwrap_or(RelayStep::Idle);
        self.transition(RelayState::Failed(reason.kind()));
        RelayError { step, reason }
    }

    fn emit(&self, event: RelayEvent) {
        if let Some(observer) = &self.orchestrator.observer {
            let _ = observer.send(event);
        }
    }
}
