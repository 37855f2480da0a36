//! AMB Relay: Cross-Chain VRF Request Orchestrator
//!
//! Moves a single application message from a source chain to a destination
//! chain through an arbitrary message bridge (AMB), then relays the
//! destination's acknowledgement back to the source chain:
//!
//! - **Types** - Message, receipts, attestations and correlation ids
//! - **Encoding** - ABI encodings shared with the on-chain contracts
//! - **Contracts** - `sol!` bindings for dispatcher, executor, adapter and helper
//! - **Chain** - `ChainClient` capability and its EVM implementation
//! - **Attestation** - `AttestationService` capability backed by the AMB helper
//! - **Relay** - the orchestrator and its state machine
//! - **Config** - environment driven configuration
//! - **Metrics** - prometheus counters for relay outcomes

pub mod attestation;
pub mod backoff;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod encoding;
pub mod metrics;
pub mod relay;
pub mod types;

pub use attestation::{AmbHelperAttestation, AttestationError, AttestationService};
pub use backoff::BackoffConfig;
pub use chain::{ChainClient, ChainError, EvmChainClient};
pub use config::{Config, RelayAddresses, StepTimeouts};
pub use relay::{
    extract_correlation_id, CorrelationError, FailureKind, FailureReason, RelayError, RelayEvent,
    RelayOrchestrator, RelayState, RelayStep,
};
pub use types::{
    Attestation, CorrelationId, DispatchReceipt, EventLog, Message, Receipt, SignerIdentity,
    TxHandle,
};
