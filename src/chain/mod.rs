//! Chain capability consumed by the relay
//!
//! The orchestrator only depends on the submit / wait / find contract below.
//! One client instance exists per chain and is shared across concurrent
//! relays, so implementations must be safe for concurrent use.
//!
//! ## Submodules
//!
//! - `evm` - JSON-RPC implementation on top of alloy providers

pub mod evm;

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::types::{EventLog, Receipt, SignerIdentity, TxHandle};

pub use evm::{EvmChainClient, EvmChainClientConfig};

/// Chain level failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Network or RPC failure while talking to the node
    #[error("submission failed: {0}")]
    Submission(String),

    /// Transaction rejected by simulation/validation before inclusion
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// Transaction was included but reverted
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },

    /// Transaction was not included and confirmed before the deadline
    #[error("transaction {tx_hash} not confirmed after {after:?}")]
    Timeout { tx_hash: B256, after: Duration },
}

impl ChainError {
    /// Whether the failure happened after the transaction reached the chain
    pub fn is_post_submission(&self) -> bool {
        matches!(self, ChainError::Reverted { .. } | ChainError::Timeout { .. })
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain id this client is connected to
    fn chain_id(&self) -> u64;

    /// Identity whose key this client signs with
    fn signer_address(&self) -> SignerIdentity;

    /// Submit a transaction calling `to` with `call_data`, signed by `signer`
    async fn submit(
        &self,
        to: Address,
        call_data: Bytes,
        signer: SignerIdentity,
    ) -> Result<TxHandle, ChainError>;

    /// Wait until the transaction is included and buried under the required
    /// confirmation depth
    async fn wait_included(&self, tx: &TxHandle, timeout: Duration) -> Result<Receipt, ChainError>;

    /// All logs in `receipt` whose signature topic equals `signature`, in
    /// emission order
    fn find_event(&self, receipt: &Receipt, signature: B256) -> Vec<EventLog> {
        receipt
            .logs
            .iter()
            .filter(|log| log.signature() == Some(signature))
            .cloned()
            .collect()
    }
}
