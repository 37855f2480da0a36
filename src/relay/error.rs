//! Relay error taxonomy

use std::time::Duration;
use thiserror::Error;

use super::state::{FailureKind, RelayStep};
use crate::attestation::AttestationError;
use crate::chain::ChainError;

/// Failure to bind the destination execution to a single correlation id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    #[error("no matching event in destination receipt")]
    Missing,

    #[error("{count} matching events in destination receipt, expected exactly one")]
    Ambiguous { count: usize },

    #[error("matching event is malformed: {0}")]
    Malformed(String),
}

/// Detailed cause of a failed relay
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("invalid relay request: {0}")]
    InvalidRequest(String),

    #[error("dispatch failed: {0}")]
    DispatchFailed(ChainError),

    #[error("no attestation after {attempts} attempts over {waited:?}")]
    AttestationTimeout { attempts: u32, waited: Duration },

    #[error("attestation rejected: {0}")]
    AttestationInvalid(AttestationError),

    #[error("destination execution failed: {0}")]
    DestinationExecutionFailed(ChainError),

    #[error("correlation extraction failed: {0}")]
    CorrelationExtractionFailed(CorrelationError),

    #[error("source execution failed: {0}")]
    SourceExecutionFailed(ChainError),

    #[error("relay cancelled")]
    Cancelled,
}

impl FailureReason {
    pub fn kind(&self) -> FailureKind {
        match self {
            FailureReason::InvalidRequest(_) => FailureKind::InvalidRequest,
            FailureReason::DispatchFailed(_) => FailureKind::DispatchFailed,
            FailureReason::AttestationTimeout { .. } => FailureKind::AttestationTimeout,
            FailureReason::AttestationInvalid(_) => FailureKind::AttestationInvalid,
            FailureReason::DestinationExecutionFailed(_) => FailureKind::DestinationExecutionFailed,
            FailureReason::CorrelationExtractionFailed(_) => FailureKind::CorrelationExtractionFailed,
            FailureReason::SourceExecutionFailed(_) => FailureKind::SourceExecutionFailed,
            FailureReason::Cancelled => FailureKind::Cancelled,
        }
    }

    /// Underlying chain error, if the failure came from a chain call
    pub fn chain_error(&self) -> Option<&ChainError> {
        match self {
            FailureReason::DispatchFailed(e)
            | FailureReason::DestinationExecutionFailed(e)
            | FailureReason::SourceExecutionFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// Terminal outcome of a failed relay
///
/// Carries the step that was in progress and the underlying cause so the
/// caller can decide whether to start a fresh relay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("relay failed while {step}: {reason}")]
pub struct RelayError {
    pub step: RelayStep,
    pub reason: FailureReason,
}

impl RelayError {
    pub fn kind(&self) -> FailureKind {
        self.reason.kind()
    }
}
