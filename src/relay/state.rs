//! Relay state machine
//!
//! ```text
//! Idle → Dispatching → AwaitingAttestation → ExecutingDestination
//!      → ExtractingCorrelation → ExecutingSource → Completed
//! ```
//!
//! `Failed` is reachable from every non-terminal state. Nothing leaves a
//! terminal state.

use alloy::primitives::B256;
use std::fmt;
use std::time::Duration;

/// Why a relay ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    InvalidRequest,
    DispatchFailed,
    AttestationTimeout,
    AttestationInvalid,
    DestinationExecutionFailed,
    CorrelationExtractionFailed,
    SourceExecutionFailed,
    Cancelled,
}

/// Per-invocation relay state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayState {
    Idle,
    Dispatching,
    AwaitingAttestation,
    ExecutingDestination,
    ExtractingCorrelation,
    ExecutingSource,
    Completed,
    Failed(FailureKind),
}

impl RelayState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayState::Completed | RelayState::Failed(_))
    }

    /// Successor on the happy path
    pub fn next(&self) -> Option<RelayState> {
        match self {
            RelayState::Idle => Some(RelayState::Dispatching),
            RelayState::Dispatching => Some(RelayState::AwaitingAttestation),
            RelayState::AwaitingAttestation => Some(RelayState::ExecutingDestination),
            RelayState::ExecutingDestination => Some(RelayState::ExtractingCorrelation),
            RelayState::ExtractingCorrelation => Some(RelayState::ExecutingSource),
            RelayState::ExecutingSource => Some(RelayState::Completed),
            RelayState::Completed | RelayState::Failed(_) => None,
        }
    }

    pub fn can_transition_to(&self, next: &RelayState) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(next, RelayState::Failed(_)) || self.next().as_ref() == Some(next)
    }

    /// The step this state represents, for non-terminal states
    pub fn step(&self) -> Option<RelayStep> {
        match self {
            RelayState::Idle => Some(RelayStep::Idle),
            RelayState::Dispatching => Some(RelayStep::Dispatching),
            RelayState::AwaitingAttestation => Some(RelayStep::AwaitingAttestation),
            RelayState::ExecutingDestination => Some(RelayStep::ExecutingDestination),
            RelayState::ExtractingCorrelation => Some(RelayStep::ExtractingCorrelation),
            RelayState::ExecutingSource => Some(RelayStep::ExecutingSource),
            RelayState::Completed | RelayState::Failed(_) => None,
        }
    }
}

/// A non-terminal state; identifies where a relay failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayStep {
    Idle,
    Dispatching,
    AwaitingAttestation,
    ExecutingDestination,
    ExtractingCorrelation,
    ExecutingSource,
}

impl RelayStep {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayStep::Idle => "idle",
            RelayStep::Dispatching => "dispatching",
            RelayStep::AwaitingAttestation => "awaiting_attestation",
            RelayStep::ExecutingDestination => "executing_destination",
            RelayStep::ExtractingCorrelation => "extracting_correlation",
            RelayStep::ExecutingSource => "executing_source",
        }
    }
}

impl fmt::Display for RelayStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress notification for observers
///
/// Purely informational; delivery failures never affect a relay.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    StateChanged {
        relay_id: u64,
        from: RelayState,
        to: RelayState,
    },
    TransactionIncluded {
        relay_id: u64,
        step: RelayStep,
        chain_id: u64,
        tx_hash: B256,
    },
    AttestationPending {
        relay_id: u64,
        attempt: u32,
        retry_in: Duration,
    },
}
