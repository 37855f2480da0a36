//! Common types for a relay operation
//!
//! These types flow between the orchestrator and its chain/attestation
//! collaborators. None of them are persisted.

use alloy::primitives::{Address, Bytes, B256};
use std::fmt;

use crate::encoding;

/// Identity used to sign a transaction (the sender address).
pub type SignerIdentity = Address;

/// Length of a single ECDSA signature in the AMB packed layout (r, s, v)
pub const SIGNATURE_LEN: usize = 65;

// ============================================================================
// Message
// ============================================================================

/// Application message relayed across chains
///
/// Identity is structural: two messages with equal fields are
/// interchangeable for protocol purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    /// Chain id the message is executed on
    pub destination_chain_id: u64,
    /// Contract invoked on the destination chain
    pub destination_address: Address,
    /// Call data delivered to `destination_address`
    pub payload: Bytes,
}

impl Message {
    pub fn new(destination_chain_id: u64, destination_address: Address, payload: Bytes) -> Self {
        Self {
            destination_chain_id,
            destination_address,
            payload,
        }
    }

    /// Message asking `consumer` on `destination_chain_id` for random words
    pub fn vrf_request(destination_chain_id: u64, consumer: Address) -> Self {
        Self::new(
            destination_chain_id,
            consumer,
            encoding::vrf_request_payload(),
        )
    }
}

// ============================================================================
// Transactions and receipts
// ============================================================================

/// Handle to a submitted (not yet included) transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxHandle {
    pub chain_id: u64,
    pub tx_hash: B256,
}

/// A single log emitted by an included transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLog {
    /// Contract that emitted the log
    pub address: Address,
    /// Topics; `topics[0]` is the event signature for non-anonymous events
    pub topics: Vec<B256>,
    /// ABI encoded non-indexed fields
    pub data: Bytes,
    /// Position of the log within its block
    pub log_index: Option<u64>,
}

impl EventLog {
    /// The event signature topic, if any
    pub fn signature(&self) -> Option<B256> {
        self.topics.first().copied()
    }
}

/// Receipt of an included, successful transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub block_number: u64,
    /// Logs in emission order
    pub logs: Vec<EventLog>,
}

/// Outcome of the dispatch step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub source_tx_hash: B256,
    pub dispatched_message: Message,
    pub adapter_address: Address,
    pub relayer_address: Address,
}

// ============================================================================
// Attestation
// ============================================================================

/// Signed proof that an encoded tuple was observed by the AMB
///
/// Keyed by `(adapter, encoded_tuple)`; the signature is only valid for that
/// exact key.
#[derive(Clone, PartialEq, Eq)]
pub struct Attestation {
    pub adapter: Address,
    pub encoded_tuple: Bytes,
    pub signature: Bytes,
}

impl Attestation {
    pub fn new(adapter: Address, encoded_tuple: Bytes, signature: Bytes) -> Self {
        Self {
            adapter,
            encoded_tuple,
            signature,
        }
    }

    /// Whether this attestation was issued for the given key
    pub fn is_for(&self, adapter: Address, encoded_tuple: &[u8]) -> bool {
        self.adapter == adapter && self.encoded_tuple.as_ref() == encoded_tuple
    }

    /// Number of signatures in the packed layout, or `None` if malformed
    ///
    /// Layout: one count byte `n` followed by `n` 65-byte signatures.
    pub fn signature_count(&self) -> Option<usize> {
        let (count, rest) = self.signature.split_first()?;
        let count = *count as usize;
        if count == 0 || rest.len() != count * SIGNATURE_LEN {
            return None;
        }
        Some(count)
    }
}

impl fmt::Debug for Attestation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attestation")
            .field("adapter", &self.adapter)
            .field("encoded_tuple_len", &self.encoded_tuple.len())
            .field("signature_len", &self.signature.len())
            .finish()
    }
}

// ============================================================================
// Correlation id
// ============================================================================

/// Identifier emitted by the destination chain that binds the destination
/// side effect to the dispatched message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(pub B256);

impl CorrelationId {
    pub fn as_b256(&self) -> B256 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<B256> for CorrelationId {
    fn from(value: B256) -> Self {
        CorrelationId(value)
    }
}
