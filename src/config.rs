use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::backoff::BackoffConfig;
use crate::chain::EvmChainClientConfig;

/// Contract addresses and chain ids for one relay route
///
/// `message_relays` and `adapters` are paired positionally in the dispatch
/// call. They are configured independently of `destination_adapter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayAddresses {
    pub source_chain_id: u64,
    pub destination_chain_id: u64,
    /// Dispatcher on the source chain (Yaho)
    pub source_dispatcher: Address,
    /// Executor on the source chain (Yaru)
    pub source_executor: Address,
    /// AMB adapter on the destination chain
    pub destination_adapter: Address,
    pub message_relays: Vec<Address>,
    pub adapters: Vec<Address>,
    /// Signer on both chains and executor identity for the return trip
    pub relayer: Address,
    /// VRF consumer on the destination chain
    pub consumer: Address,
}

impl RelayAddresses {
    /// Check the dispatch fan-out lists
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.message_relays.is_empty() {
            return Err("at least one message relay is required".to_string());
        }
        if self.message_relays.len() != self.adapters.len() {
            return Err(format!(
                "{} message relays but {} adapters; lists are paired positionally",
                self.message_relays.len(),
                self.adapters.len()
            ));
        }
        Ok(())
    }
}

/// Per-step inclusion deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTimeouts {
    pub dispatch: Duration,
    pub destination: Duration,
    pub source: Duration,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            dispatch: Duration::from_secs(default_timeout_secs()),
            destination: Duration::from_secs(default_timeout_secs()),
            source: Duration::from_secs(default_timeout_secs()),
        }
    }
}

/// RPC endpoint of one chain
#[derive(Debug, Clone)]
pub struct ChainEndpoint {
    pub rpc_url: String,
    pub chain_id: u64,
}

/// Main configuration for the relay binary
#[derive(Clone)]
pub struct Config {
    pub source: ChainEndpoint,
    pub destination: ChainEndpoint,
    pub private_key: String,
    pub amb_helper: Address,
    pub amb_helper_rpc_url: String,
    pub addresses: RelayAddresses,
    pub confirmations: u64,
    pub poll_interval: Duration,
    pub timeouts: StepTimeouts,
    pub attestation_backoff: BackoffConfig,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("private_key", &"<redacted>")
            .field("amb_helper", &self.amb_helper)
            .field("amb_helper_rpc_url", &self.amb_helper_rpc_url)
            .field("addresses", &self.addresses)
            .field("confirmations", &self.confirmations)
            .field("poll_interval", &self.poll_interval)
            .field("timeouts", &self.timeouts)
            .field("attestation_backoff", &self.attestation_backoff)
            .finish()
    }
}

/// Default functions
fn default_confirmations() -> u64 {
    1
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    300
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    fn load_from_env() -> Result<Self> {
        let source = ChainEndpoint {
            rpc_url: required("SOURCE_RPC_URL")?,
            chain_id: required_parsed("SOURCE_CHAIN_ID")?,
        };
        let destination = ChainEndpoint {
            rpc_url: required("DESTINATION_RPC_URL")?,
            chain_id: required_parsed("DESTINATION_CHAIN_ID")?,
        };

        let private_key = required("RELAYER_PRIVATE_KEY")?;
        let relayer = relayer_address(&private_key)?;

        let destination_adapter = required_address("DESTINATION_ADAPTER_ADDRESS")?;
        let message_relays = address_list(&required("MESSAGE_RELAY_ADDRESSES")?)
            .wrap_err("MESSAGE_RELAY_ADDRESSES must be comma-separated addresses")?;
        let adapters = match env::var("ADAPTER_ADDRESSES") {
            Ok(raw) => address_list(&raw)
                .wrap_err("ADAPTER_ADDRESSES must be comma-separated addresses")?,
            Err(_) => vec![destination_adapter; message_relays.len()],
        };

        let addresses = RelayAddresses {
            source_chain_id: source.chain_id,
            destination_chain_id: destination.chain_id,
            source_dispatcher: required_address("SOURCE_DISPATCHER_ADDRESS")?,
            source_executor: required_address("SOURCE_EXECUTOR_ADDRESS")?,
            destination_adapter,
            message_relays,
            adapters,
            relayer,
            consumer: required_address("CONSUMER_ADDRESS")?,
        };

        let defaults = BackoffConfig::default();
        let attestation_backoff = BackoffConfig {
            initial_backoff: Duration::from_millis(optional_parsed(
                "ATTESTATION_INITIAL_BACKOFF_MS",
                defaults.initial_backoff.as_millis() as u64,
            )),
            max_backoff: Duration::from_millis(optional_parsed(
                "ATTESTATION_MAX_BACKOFF_MS",
                defaults.max_backoff.as_millis() as u64,
            )),
            backoff_multiplier: optional_parsed(
                "ATTESTATION_BACKOFF_MULTIPLIER",
                defaults.backoff_multiplier,
            ),
            max_wait: Duration::from_secs(optional_parsed(
                "ATTESTATION_MAX_WAIT_SECS",
                defaults.max_wait.as_secs(),
            )),
        };

        let timeouts = StepTimeouts {
            dispatch: Duration::from_secs(optional_parsed(
                "DISPATCH_TIMEOUT_SECS",
                default_timeout_secs(),
            )),
            destination: Duration::from_secs(optional_parsed(
                "DESTINATION_TIMEOUT_SECS",
                default_timeout_secs(),
            )),
            source: Duration::from_secs(optional_parsed(
                "SOURCE_TIMEOUT_SECS",
                default_timeout_secs(),
            )),
        };

        let config = Config {
            amb_helper_rpc_url: env::var("AMB_HELPER_RPC_URL")
                .unwrap_or_else(|_| source.rpc_url.clone()),
            amb_helper: required_address("AMB_HELPER_ADDRESS")?,
            source,
            destination,
            private_key,
            addresses,
            confirmations: optional_parsed("CONFIRMATIONS", default_confirmations()),
            poll_interval: Duration::from_millis(optional_parsed(
                "POLL_INTERVAL_MS",
                default_poll_interval_ms(),
            )),
            timeouts,
            attestation_backoff,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.source.rpc_url.is_empty() {
            return Err(eyre!("source.rpc_url cannot be empty"));
        }
        if self.destination.rpc_url.is_empty() {
            return Err(eyre!("destination.rpc_url cannot be empty"));
        }
        if self.source.chain_id == self.destination.chain_id {
            return Err(eyre!(
                "source and destination chain ids must differ (both {})",
                self.source.chain_id
            ));
        }

        let key = self
            .private_key
            .strip_prefix("0x")
            .unwrap_or(&self.private_key);
        if key.len() != 64 || hex::decode(key).is_err() {
            return Err(eyre!("private_key must be 32 bytes of hex (0x + 64 hex chars)"));
        }

        self.addresses
            .validate()
            .map_err(|e| eyre!("invalid addresses: {}", e))?;

        if self.addresses.destination_chain_id != self.destination.chain_id
            || self.addresses.source_chain_id != self.source.chain_id
        {
            return Err(eyre!("address set chain ids do not match the endpoints"));
        }

        for (name, timeout) in [
            ("dispatch", self.timeouts.dispatch),
            ("destination", self.timeouts.destination),
            ("source", self.timeouts.source),
        ] {
            if timeout.is_zero() {
                return Err(eyre!("{} timeout must be positive", name));
            }
        }

        if self.attestation_backoff.backoff_multiplier < 1.0 {
            return Err(eyre!("attestation backoff multiplier must be >= 1.0"));
        }
        if self.attestation_backoff.initial_backoff.is_zero() {
            return Err(eyre!("attestation initial backoff must be positive"));
        }

        Ok(())
    }

    /// Client configuration for the source chain
    pub fn source_client(&self) -> EvmChainClientConfig {
        self.client_config(&self.source)
    }

    /// Client configuration for the destination chain
    pub fn destination_client(&self) -> EvmChainClientConfig {
        self.client_config(&self.destination)
    }

    fn client_config(&self, endpoint: &ChainEndpoint) -> EvmChainClientConfig {
        EvmChainClientConfig {
            rpc_url: endpoint.rpc_url.clone(),
            chain_id: endpoint.chain_id,
            private_key: self.private_key.clone(),
            confirmations: self.confirmations,
            poll_interval: self.poll_interval,
        }
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| eyre!("{} environment variable is required", name))
}

fn required_parsed<T: std::str::FromStr>(name: &str) -> Result<T> {
    required(name)?
        .parse()
        .map_err(|_| eyre!("{} has an invalid value", name))
}

fn optional_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn required_address(name: &str) -> Result<Address> {
    let raw = required(name)?;
    raw.trim()
        .parse()
        .map_err(|e| eyre!("{} is not a valid address: {}", name, e))
}

/// Parse a comma-separated list of addresses, skipping empty entries
pub fn address_list(raw: &str) -> Result<Vec<Address>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Address>()
                .map_err(|e| eyre!("invalid address '{}': {}", s, e))
        })
        .collect()
}

fn relayer_address(private_key: &str) -> Result<Address> {
    let signer: alloy::signers::local::PrivateKeySigner = private_key
        .parse()
        .map_err(|_| eyre!("RELAYER_PRIVATE_KEY is not a valid private key"))?;
    Ok(signer.address())
}
