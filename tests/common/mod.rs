//! Mock collaborators for relay integration tests
//!
//! Every chain and attestation call is appended to a shared [`CallLog`] so
//! tests can assert on cross-component ordering.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{address, Address, Bytes, B256};
use amb_relay::relay::MESSAGE_DISPATCHED;
use amb_relay::{
    Attestation, AttestationError, AttestationService, BackoffConfig, ChainClient, ChainError,
    EventLog, Receipt, RelayAddresses, SignerIdentity, StepTimeouts, TxHandle,
};
use async_trait::async_trait;
use tokio::time::Instant;

pub const SOURCE_CHAIN_ID: u64 = 100;
pub const DESTINATION_CHAIN_ID: u64 = 5;

pub const VRF: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");
pub const DISPATCHER: Address = address!("1000000000000000000000000000000000000001");
pub const EXECUTOR: Address = address!("1000000000000000000000000000000000000002");
pub const ADAPTER: Address = address!("2000000000000000000000000000000000000001");
pub const MESSAGE_RELAY: Address = address!("1000000000000000000000000000000000000003");
pub const RELAYER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Submit {
        chain: &'static str,
        to: Address,
        data: Bytes,
        signer: Address,
    },
    Wait {
        chain: &'static str,
        tx_hash: B256,
    },
    Attest {
        adapter: Address,
        tuple: Bytes,
    },
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Snapshot of recorded calls
pub fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().unwrap().clone()
}

/// Submissions recorded for `chain`, in order
pub fn submissions(log: &CallLog, chain: &str) -> Vec<(Address, Bytes)> {
    calls(log)
        .into_iter()
        .filter_map(|c| match c {
            Call::Submit { chain: c, to, data, .. } if c == chain => Some((to, data)),
            _ => None,
        })
        .collect()
}

pub fn attest_count(log: &CallLog) -> usize {
    calls(log)
        .iter()
        .filter(|c| matches!(c, Call::Attest { .. }))
        .count()
}

/// `MessageDispatched` log carrying `id` as the message id topic
pub fn dispatched_log(id: B256) -> EventLog {
    EventLog {
        address: ADAPTER,
        topics: vec![
            MESSAGE_DISPATCHED,
            id,
            B256::left_padding_from(RELAYER.as_slice()),
            B256::left_padding_from(&[DESTINATION_CHAIN_ID as u8]),
        ],
        data: Bytes::new(),
        log_index: Some(0),
    }
}

/// Unrelated log that must never match
pub fn noise_log() -> EventLog {
    EventLog {
        address: ADAPTER,
        topics: vec![B256::repeat_byte(0xEE)],
        data: Bytes::from(vec![0x01]),
        log_index: Some(1),
    }
}

/// Packed AMB signature blob with one signature
pub fn valid_signature() -> Bytes {
    let mut sig = vec![1u8];
    sig.extend(std::iter::repeat(0x5Au8).take(65));
    Bytes::from(sig)
}

pub fn addresses() -> RelayAddresses {
    RelayAddresses {
        source_chain_id: SOURCE_CHAIN_ID,
        destination_chain_id: DESTINATION_CHAIN_ID,
        source_dispatcher: DISPATCHER,
        source_executor: EXECUTOR,
        destination_adapter: ADAPTER,
        message_relays: vec![MESSAGE_RELAY],
        adapters: vec![ADAPTER],
        relayer: RELAYER,
        consumer: VRF,
    }
}

pub fn timeouts() -> StepTimeouts {
    StepTimeouts {
        dispatch: Duration::from_secs(30),
        destination: Duration::from_secs(30),
        source: Duration::from_secs(30),
    }
}

/// 1s, 2s, 4s, ... with a 10s total budget
pub fn fast_backoff() -> BackoffConfig {
    BackoffConfig {
        initial_backoff: Duration::from_secs(1),
        max_backoff: Duration::from_secs(10),
        backoff_multiplier: 2.0,
        max_wait: Duration::from_secs(10),
    }
}

// ============================================================================
// Chain mock
// ============================================================================

/// Scripted chain client
///
/// Submissions succeed unless a failure is queued. Each wait pops the next
/// scripted outcome; with nothing queued it returns a receipt whose logs come
/// from `default_logs` (empty by default).
pub struct MockChain {
    name: &'static str,
    chain_id: u64,
    log: CallLog,
    submit_failures: Mutex<VecDeque<Option<ChainError>>>,
    wait_outcomes: Mutex<VecDeque<Result<Vec<EventLog>, ChainError>>>,
    default_logs: fn(B256) -> Vec<EventLog>,
    signer: Address,
    hang_waits: bool,
    next_tx: AtomicU64,
}

impl MockChain {
    pub fn new(name: &'static str, chain_id: u64, log: CallLog) -> Self {
        Self {
            name,
            chain_id,
            log,
            submit_failures: Mutex::new(VecDeque::new()),
            wait_outcomes: Mutex::new(VecDeque::new()),
            default_logs: |_| Vec::new(),
            signer: RELAYER,
            hang_waits: false,
            next_tx: AtomicU64::new(1),
        }
    }

    pub fn source(log: CallLog) -> Self {
        Self::new("source", SOURCE_CHAIN_ID, log)
    }

    pub fn destination(log: CallLog) -> Self {
        Self::new("destination", DESTINATION_CHAIN_ID, log)
    }

    /// Outcome of the next submission (`None` = success)
    pub fn queue_submit(self, outcome: Option<ChainError>) -> Self {
        self.submit_failures.lock().unwrap().push_back(outcome);
        self
    }

    /// Outcome of the next wait: receipt logs or a chain error
    pub fn queue_wait(self, outcome: Result<Vec<EventLog>, ChainError>) -> Self {
        self.wait_outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn with_default_logs(mut self, logs: fn(B256) -> Vec<EventLog>) -> Self {
        self.default_logs = logs;
        self
    }

    pub fn with_signer(mut self, signer: Address) -> Self {
        self.signer = signer;
        self
    }

    /// Waits never resolve and ignore their deadline
    pub fn hanging(mut self) -> Self {
        self.hang_waits = true;
        self
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }

    /// Tx hashes are unique per chain: chain id in the first bytes, counter last
    fn next_hash(&self) -> B256 {
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&self.chain_id.to_be_bytes());
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        B256::from(bytes)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn signer_address(&self) -> SignerIdentity {
        self.signer
    }

    async fn submit(
        &self,
        to: Address,
        call_data: Bytes,
        signer: SignerIdentity,
    ) -> Result<TxHandle, ChainError> {
        self.record(Call::Submit {
            chain: self.name,
            to,
            data: call_data,
            signer,
        });

        if let Some(Some(err)) = self.submit_failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        Ok(TxHandle {
            chain_id: self.chain_id,
            tx_hash: self.next_hash(),
        })
    }

    async fn wait_included(&self, tx: &TxHandle, _timeout: Duration) -> Result<Receipt, ChainError> {
        self.record(Call::Wait {
            chain: self.name,
            tx_hash: tx.tx_hash,
        });

        if self.hang_waits {
            std::future::pending::<()>().await;
        }

        // Yield so concurrent relays interleave
        tokio::task::yield_now().await;

        let scripted = self.wait_outcomes.lock().unwrap().pop_front();
        let logs = match scripted {
            Some(outcome) => outcome?,
            None => (self.default_logs)(tx.tx_hash),
        };

        Ok(Receipt {
            tx_hash: tx.tx_hash,
            block_number: 1,
            logs,
        })
    }
}

// ============================================================================
// Attestation mock
// ============================================================================

/// Scripted attestation service
///
/// Pops queued responses first, then falls back to `fallback` forever.
/// Records the (paused-clock) instant of every poll.
pub struct MockAttestation {
    log: CallLog,
    responses: Mutex<VecDeque<Result<Bytes, AttestationError>>>,
    fallback: Result<Bytes, AttestationError>,
    issued_for: Option<Bytes>,
    polled_at: Mutex<Vec<Instant>>,
}

impl MockAttestation {
    /// Always answers with a valid signature
    pub fn ready(log: CallLog) -> Self {
        Self::with_fallback(log, Ok(valid_signature()))
    }

    /// Never has an attestation
    pub fn never(log: CallLog) -> Self {
        Self::with_fallback(
            log,
            Err(AttestationError::Unavailable("not signed".to_string())),
        )
    }

    pub fn with_fallback(log: CallLog, fallback: Result<Bytes, AttestationError>) -> Self {
        Self {
            log,
            responses: Mutex::new(VecDeque::new()),
            fallback,
            issued_for: None,
            polled_at: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(self, response: Result<Bytes, AttestationError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Answer with attestations keyed to `tuple` instead of the requested one
    pub fn issued_for(mut self, tuple: Bytes) -> Self {
        self.issued_for = Some(tuple);
        self
    }

    pub fn polled_at(&self) -> Vec<Instant> {
        self.polled_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttestationService for MockAttestation {
    async fn get_signature(
        &self,
        adapter: Address,
        encoded_tuple: Bytes,
    ) -> Result<Attestation, AttestationError> {
        self.log.lock().unwrap().push(Call::Attest {
            adapter,
            tuple: encoded_tuple.clone(),
        });
        self.polled_at.lock().unwrap().push(Instant::now());

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        let tuple = self.issued_for.clone().unwrap_or(encoded_tuple);
        response.map(|signature| Attestation::new(adapter, tuple, signature))
    }
}
