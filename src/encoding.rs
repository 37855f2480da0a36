//! Canonical ABI encodings shared with the on-chain contracts
//!
//! Everything here is pure and deterministic. The attestation tuple in
//! particular must match what the destination adapter decodes bit-for-bit:
//!
//! ```solidity
//! abi.encode(address to, bytes data)
//! ```

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{sol_data, SolCall, SolType, SolValue};

use crate::contracts::{self, AmbAdapter, VrfConsumer, Yaho, Yaru};
use crate::types::{CorrelationId, Message};

/// `(address, bytes)` parameter list signed by the AMB validators
type AttestationTuple = (sol_data::Address, sol_data::Bytes);

/// Convert a domain message into its contract representation
pub fn to_sol_message(message: &Message) -> contracts::Message {
    contracts::Message {
        to: message.destination_address,
        toChainId: U256::from(message.destination_chain_id),
        data: message.payload.clone(),
    }
}

/// ABI encoding of the `Message` struct as the dispatcher decodes it
pub fn encode_message(message: &Message) -> Bytes {
    Bytes::from(to_sol_message(message).abi_encode())
}

/// Inverse of [`encode_message`]
pub fn decode_message(data: &[u8]) -> Result<Message, alloy::sol_types::Error> {
    let decoded = <contracts::Message as SolValue>::abi_decode(data, true)?;
    let destination_chain_id = u64::try_from(decoded.toChainId)
        .map_err(|_| alloy::sol_types::Error::custom("toChainId exceeds u64"))?;
    Ok(Message::new(destination_chain_id, decoded.to, decoded.data))
}

/// Call data for the consumer's zero-argument `requestRandomWords()`
pub fn vrf_request_payload() -> Bytes {
    Bytes::from(VrfConsumer::requestRandomWordsCall {}.abi_encode())
}

/// Tuple the AMB attests to and the adapter executes
pub fn encode_attestation_tuple(destination_address: Address, payload: &Bytes) -> Bytes {
    Bytes::from(AttestationTuple::abi_encode_params(&(
        destination_address,
        payload.clone(),
    )))
}

/// Inverse of [`encode_attestation_tuple`]
pub fn decode_attestation_tuple(data: &[u8]) -> Result<(Address, Bytes), alloy::sol_types::Error> {
    AttestationTuple::abi_decode_params(data, true)
}

// ============================================================================
// Contract call data
// ============================================================================

/// `Yaho.dispatchMessagesToAdapters([message], messageRelays, adapters)`
pub fn dispatch_call(message: &Message, message_relays: &[Address], adapters: &[Address]) -> Bytes {
    let call = Yaho::dispatchMessagesToAdaptersCall {
        messages: vec![to_sol_message(message)],
        messageRelays: message_relays.to_vec(),
        adapters: adapters.to_vec(),
    };
    Bytes::from(call.abi_encode())
}

/// `AmbAdapter.executeSignature(encodedTuple, signatures)`
pub fn execute_signature_call(encoded_tuple: &Bytes, signatures: &Bytes) -> Bytes {
    let call = AmbAdapter::executeSignatureCall {
        data: encoded_tuple.clone(),
        signatures: signatures.clone(),
    };
    Bytes::from(call.abi_encode())
}

/// `Yaru.executeMessages([message], [id], [executor], [adapter])`
pub fn execute_messages_call(
    message: &Message,
    correlation_id: CorrelationId,
    executor: Address,
    adapter: Address,
) -> Bytes {
    let call = Yaru::executeMessagesCall {
        messages: vec![to_sol_message(message)],
        messageIds: vec![correlation_id.as_b256()],
        senders: vec![executor],
        adapters: vec![adapter],
    };
    Bytes::from(call.abi_encode())
}
