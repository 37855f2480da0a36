//! EVM chain client
//!
//! Implements [`ChainClient`] over JSON-RPC with an alloy provider holding the
//! relayer's wallet. Nonce, gas limit and gas price are filled explicitly
//! before sending; gas estimation doubles as the pre-inclusion simulation.

use alloy::{
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, B256},
    providers::{
        fillers::{FillProvider, JoinFill, WalletFiller},
        Identity, PendingTransactionBuilder, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::{
        http::{Client, Http},
        RpcError, TransportErrorKind,
    },
};
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{ChainClient, ChainError};
use crate::types::{EventLog, Receipt, SignerIdentity, TxHandle};

/// Extra gas on top of the estimate, in percent
const GAS_LIMIT_HEADROOM_PERCENT: u64 = 20;

type SignerProvider = FillProvider<
    JoinFill<Identity, WalletFiller<EthereumWallet>>,
    RootProvider<Http<Client>>,
    Http<Client>,
    Ethereum,
>;

/// EVM client configuration
#[derive(Clone)]
pub struct EvmChainClientConfig {
    /// RPC URL (e.g., "http://localhost:8545")
    pub rpc_url: String,
    /// Chain ID
    pub chain_id: u64,
    /// Private key (hex string, with or without 0x prefix)
    pub private_key: String,
    /// Blocks (including the inclusion block) a receipt must be buried under
    pub confirmations: u64,
    /// How often to poll for receipts
    pub poll_interval: Duration,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for EvmChainClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmChainClientConfig")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("private_key", &"<redacted>")
            .field("confirmations", &self.confirmations)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// EVM chain client with a single signing key
pub struct EvmChainClient {
    provider: SignerProvider,
    chain_id: u64,
    signer_address: Address,
    confirmations: u64,
    poll_interval: Duration,
    /// Held from nonce lookup through broadcast
    nonces: Mutex<NonceTracker>,
}

impl EvmChainClient {
    /// Create a new EVM chain client from configuration
    pub fn new(config: EvmChainClientConfig) -> Result<Self> {
        let signer: PrivateKeySigner = config
            .private_key
            .parse()
            .map_err(|e| eyre!("Invalid private key: {}", e))?;

        let signer_address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new().wallet(wallet).on_http(
            config
                .rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL: {}", e))?,
        );

        info!(
            rpc_url = %config.rpc_url,
            chain_id = config.chain_id,
            address = %signer_address,
            confirmations = config.confirmations,
            "Created EVM chain client"
        );

        Ok(Self {
            provider,
            chain_id: config.chain_id,
            signer_address,
            confirmations: config.confirmations.max(1),
            poll_interval: config.poll_interval,
            nonces: Mutex::new(NonceTracker::default()),
        })
    }

    /// Check the node reports the configured chain id
    pub async fn verify_chain_id(&self) -> Result<()> {
        let reported = self.provider.get_chain_id().await?;
        if reported != self.chain_id {
            return Err(eyre!(
                "RPC reports chain id {}, configured {}",
                reported,
                self.chain_id
            ));
        }
        Ok(())
    }

    /// One receipt poll: `None` while pending or not yet deep enough
    async fn poll_receipt(&self, tx: &TxHandle) -> Result<Option<Receipt>, ChainError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx.tx_hash)
            .await
            .map_err(|e| ChainError::Submission(e.to_string()))?;

        let Some(receipt) = receipt else {
            return Ok(None);
        };

        check_status(receipt.status(), tx.tx_hash)?;

        let Some(tx_block) = receipt.block_number else {
            return Ok(None);
        };

        let current_block = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Submission(e.to_string()))?;

        if !is_buried(current_block, tx_block, self.confirmations) {
            debug!(
                tx_hash = %tx.tx_hash,
                depth = confirmation_depth(current_block, tx_block),
                required = self.confirmations,
                "Waiting for confirmations"
            );
            return Ok(None);
        }

        Ok(Some(convert_receipt(&receipt, tx_block)))
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn signer_address(&self) -> SignerIdentity {
        self.signer_address
    }

    async fn submit(
        &self,
        to: Address,
        call_data: Bytes,
        signer: SignerIdentity,
    ) -> Result<TxHandle, ChainError> {
        if signer != self.signer_address {
            return Err(ChainError::Rejected(format!(
                "no key loaded for signer {}",
                signer
            )));
        }

        // Concurrent relays share this key; serialize nonce assignment
        let mut nonces = self.nonces.lock().await;

        let chain_nonce = self
            .provider
            .get_transaction_count(signer)
            .pending()
            .await
            .map_err(|e| ChainError::Submission(e.to_string()))?;
        let nonce = nonces.reserve(chain_nonce);

        let pending = match self.build_and_send(signer, to, call_data, nonce).await {
            Ok(pending) => pending,
            Err(e) => {
                nonces.release(nonce);
                return Err(e);
            }
        };
        drop(nonces);

        let tx_hash = *pending.tx_hash();

        info!(
            chain_id = self.chain_id,
            to = %to,
            tx_hash = %tx_hash,
            nonce,
            "Transaction sent"
        );

        Ok(TxHandle {
            chain_id: self.chain_id,
            tx_hash,
        })
    }

    async fn wait_included(&self, tx: &TxHandle, timeout: Duration) -> Result<Receipt, ChainError> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            // A hung RPC call must not outlive the deadline
            match tokio::time::timeout(remaining, self.poll_receipt(tx)).await {
                Err(_) => break,
                Ok(Ok(Some(receipt))) => {
                    info!(
                        chain_id = self.chain_id,
                        tx_hash = %tx.tx_hash,
                        block = receipt.block_number,
                        "Transaction confirmed"
                    );
                    return Ok(receipt);
                }
                Ok(Ok(None)) => {}
                Ok(Err(ChainError::Submission(e))) => {
                    warn!(tx_hash = %tx.tx_hash, error = %e, "Receipt poll failed, retrying");
                }
                Ok(Err(e)) => return Err(e),
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }

        Err(ChainError::Timeout {
            tx_hash: tx.tx_hash,
            after: timeout,
        })
    }
}

impl EvmChainClient {
    /// Fill gas for a transaction with a fixed nonce and broadcast it
    async fn build_and_send(
        &self,
        signer: Address,
        to: Address,
        call_data: Bytes,
        nonce: u64,
    ) -> Result<PendingTransactionBuilder<Http<Client>, Ethereum>, ChainError> {
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| ChainError::Submission(e.to_string()))?;

        let mut tx = TransactionRequest::default()
            .with_from(signer)
            .with_to(to)
            .with_input(call_data)
            .with_nonce(nonce)
            .with_chain_id(self.chain_id)
            .with_gas_price(gas_price);

        let gas = self
            .provider
            .estimate_gas(&tx)
            .await
            .map_err(classify_rpc_error)?;
        tx.set_gas_limit(gas + gas * GAS_LIMIT_HEADROOM_PERCENT / 100);

        self.provider
            .send_transaction(tx)
            .await
            .map_err(classify_rpc_error)
    }
}

/// Next-nonce bookkeeping for one signing key
///
/// The node's pending count lags behind transactions this process has just
/// broadcast, so the highest nonce handed out locally wins.
#[derive(Debug, Default)]
struct NonceTracker {
    next: Option<u64>,
}

impl NonceTracker {
    fn reserve(&mut self, chain_nonce: u64) -> u64 {
        let nonce = match self.next {
            Some(next) => next.max(chain_nonce),
            None => chain_nonce,
        };
        self.next = Some(nonce + 1);
        nonce
    }

    /// Hand `nonce` back after a broadcast that never reached the node
    fn release(&mut self, nonce: u64) {
        if self.next == Some(nonce + 1) {
            self.next = Some(nonce);
        }
    }
}

fn check_status(status: bool, tx_hash: B256) -> Result<(), ChainError> {
    if status {
        Ok(())
    } else {
        Err(ChainError::Reverted { tx_hash })
    }
}

/// Blocks burying `tx_block`, counting the inclusion block itself
fn confirmation_depth(head: u64, tx_block: u64) -> u64 {
    head.saturating_sub(tx_block) + 1
}

fn is_buried(head: u64, tx_block: u64, confirmations: u64) -> bool {
    confirmation_depth(head, tx_block) >= confirmations
}

/// JSON-RPC error responses mean the node refused the transaction; anything
/// else is a transport problem
fn classify_rpc_error(error: RpcError<TransportErrorKind>) -> ChainError {
    match error {
        RpcError::ErrorResp(payload) => ChainError::Rejected(payload.message.to_string()),
        other => ChainError::Submission(other.to_string()),
    }
}

fn convert_receipt(receipt: &TransactionReceipt, block_number: u64) -> Receipt {
    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| EventLog {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
            log_index: log.log_index,
        })
        .collect();

    Receipt {
        tx_hash: receipt.transaction_hash,
        block_number,
        logs,
    }
}
