//! Attestation lookup
//!
//! Attestations become available some time after the dispatch transaction
//! is final. `Unavailable` is therefore an expected, retryable answer.

use alloy::{
    primitives::{Address, Bytes},
    providers::{ProviderBuilder, RootProvider},
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use eyre::{eyre, Result};
use thiserror::Error;
use tracing::{debug, info};

use crate::contracts::AmbHelper;
use crate::types::Attestation;

/// Attestation level failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttestationError {
    /// Nothing to return yet for this tuple; poll again later
    #[error("attestation not available yet: {0}")]
    Unavailable(String),

    /// The service returned a signature that cannot be used
    #[error("invalid attestation: {0}")]
    Invalid(String),
}

#[async_trait]
pub trait AttestationService: Send + Sync {
    /// Signed attestation for `(adapter, encoded_tuple)`
    async fn get_signature(
        &self,
        adapter: Address,
        encoded_tuple: Bytes,
    ) -> Result<Attestation, AttestationError>;
}

/// Attestation service backed by the AMB helper contract view
pub struct AmbHelperAttestation {
    helper: AmbHelper::AmbHelperInstance<Http<Client>, RootProvider<Http<Client>>>,
}

impl AmbHelperAttestation {
    pub fn new(rpc_url: &str, helper_address: Address) -> Result<Self> {
        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL: {}", e))?,
        );

        info!(rpc_url = %rpc_url, helper = %helper_address, "Created AMB helper attestation client");

        Ok(Self {
            helper: AmbHelper::new(helper_address, provider),
        })
    }
}

#[async_trait]
impl AttestationService for AmbHelperAttestation {
    async fn get_signature(
        &self,
        adapter: Address,
        encoded_tuple: Bytes,
    ) -> Result<Attestation, AttestationError> {
        let signatures = self
            .helper
            .getSignatures(adapter, encoded_tuple.clone())
            .call()
            .await
            // Transient query failures are indistinguishable from "not yet" to the caller
            .map_err(|e| AttestationError::Unavailable(e.to_string()))?
            .signatures;

        debug!(adapter = %adapter, len = signatures.len(), "AMB helper responded");

        validate(Attestation::new(adapter, encoded_tuple, signatures))
    }
}

/// Classify a raw helper answer
///
/// Empty bytes mean the validators have not signed yet; anything non-empty
/// must follow the packed layout.
pub fn validate(attestation: Attestation) -> Result<Attestation, AttestationError> {
    if attestation.signature.is_empty() {
        return Err(AttestationError::Unavailable(
            "no signatures collected".to_string(),
        ));
    }
    if attestation.signature_count().is_none() {
        return Err(AttestationError::Invalid(format!(
            "malformed signature blob of {} bytes",
            attestation.signature.len()
        )));
    }
    Ok(attestation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SIGNATURE_LEN;

    fn attestation(signature: Vec<u8>) -> Attestation {
        Attestation::new(
            Address::repeat_byte(0x0A),
            Bytes::from(vec![0x01]),
            Bytes::from(signature),
        )
    }

    #[test]
    fn test_empty_is_unavailable() {
        let err = validate(attestation(vec![])).unwrap_err();
        assert!(matches!(err, AttestationError::Unavailable(_)));
    }

    #[test]
    fn test_truncated_is_invalid() {
        let mut sig = vec![1u8];
        sig.extend(vec![0u8; SIGNATURE_LEN - 1]);
        let err = validate(attestation(sig)).unwrap_err();
        assert!(matches!(err, AttestationError::Invalid(_)));
    }

    #[test]
    fn test_well_formed_passes() {
        let mut sig = vec![1u8];
        sig.extend(vec![0u8; SIGNATURE_LEN]);
        let att = validate(attestation(sig)).unwrap();
        assert_eq!(att.signature_count(), Some(1));
    }

    #[test]
    fn test_helper_client_creation() {
        assert!(AmbHelperAttestation::new("http://localhost:8545", Address::ZERO).is_ok());
        assert!(AmbHelperAttestation::new("not a url", Address::ZERO).is_err());
    }
}
