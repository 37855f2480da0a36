//! Correlation id extraction from the destination receipt

use alloy::primitives::B256;
use alloy::sol_types::SolEvent;

use super::error::CorrelationError;
use crate::contracts::Yaho;
use crate::types::{CorrelationId, EventLog};

/// Signature topic of `MessageDispatched`
pub const MESSAGE_DISPATCHED: B256 = Yaho::MessageDispatched::SIGNATURE_HASH;

/// Extract the single correlation id from matching `MessageDispatched` logs
///
/// Zero or several matches are protocol errors; the first match is never
/// picked silently.
pub fn extract_correlation_id(logs: &[EventLog]) -> Result<CorrelationId, CorrelationError> {
    match logs {
        [] => Err(CorrelationError::Missing),
        [log] => {
            if log.signature() != Some(MESSAGE_DISPATCHED) {
                return Err(CorrelationError::Malformed(
                    "log is not a MessageDispatched event".to_string(),
                ));
            }
            // topic[1] = messageId (indexed bytes32)
            log.topics
                .get(1)
                .copied()
                .map(CorrelationId::from)
                .ok_or_else(|| CorrelationError::Malformed("missing messageId topic".to_string()))
        }
        many => Err(CorrelationError::Ambiguous { count: many.len() }),
    }
}
