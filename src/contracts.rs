//! AMB relay contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the contracts
//! the relay talks to:
//!
//! - `Yaho` - source chain dispatcher (`dispatchMessagesToAdapters`)
//! - `Yaru` - source chain executor (`executeMessages`)
//! - `AmbAdapter` - destination chain adapter (`executeSignature`)
//! - `AmbHelper` - attestation lookup (`getSignatures`)
//! - `VrfConsumer` - destination application (`requestRandomWords`)

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    /// Cross-chain message as decoded by the dispatcher and executor
    #[derive(Debug, PartialEq, Eq)]
    struct Message {
        address to;
        uint256 toChainId;
        bytes data;
    }

    #[sol(rpc)]
    contract Yaho {
        /// Dispatch messages and hand them to the given relays/adapters.
        /// `messageRelays` and `adapters` are paired positionally.
        function dispatchMessagesToAdapters(
            Message[] memory messages,
            address[] memory messageRelays,
            address[] memory adapters
        ) external payable returns (bytes32[] memory messageIds);

        /// Emitted once per dispatched message; `messageId` is the correlation id
        event MessageDispatched(
            bytes32 indexed messageId,
            address indexed from,
            uint256 indexed toChainId,
            address to,
            bytes data
        );
    }

    #[sol(rpc)]
    contract Yaru {
        /// Execute messages whose ids have been attested by every adapter
        function executeMessages(
            Message[] memory messages,
            bytes32[] memory messageIds,
            address[] memory senders,
            address[] memory adapters
        ) external returns (bytes[] memory results);
    }

    #[sol(rpc)]
    contract AmbAdapter {
        /// Execute an attested AMB message on this chain
        function executeSignature(bytes memory data, bytes memory signatures) external;
    }

    #[sol(rpc)]
    contract AmbHelper {
        /// Packed validator signatures for `data`; empty until collected
        function getSignatures(address adapter, bytes memory data) external view returns (bytes memory signatures);
    }

    #[sol(rpc)]
    contract VrfConsumer {
        function requestRandomWords() external returns (uint256 requestId);
    }
}
