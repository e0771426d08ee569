//! Top-level configuration for a Synapse client.
//!
//! This module aggregates configuration for:
//!
//! - the consensus API session (`TransportConfig`),
//! - the background consensus loop (`LoopConfig`),
//! - the Prometheus exporter (`MetricsConfig`),
//! - and the node identity (private key, contract address).
//!
//! The goal is to have a single `ClientConfig` struct that higher-level
//! binaries can construct from defaults, config files, or environment
//! variables as needed.

use std::net::SocketAddr;
use std::time::Duration;

/// Default header carrying the node address on every request.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Configuration for the HTTP session to the consensus API.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Overall per-request timeout.
    pub timeout: Duration,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Name of the header carrying the node address.
    pub api_key_header: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
        }
    }
}

/// Configuration for the background consensus loop.
#[derive(Clone, Debug)]
pub struct LoopConfig {
    /// Fixed delay between the end of one round and the start of the next.
    pub interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 9899)),
        }
    }
}

/// Top-level configuration for a Synapse client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the consensus API, e.g. `"http://127.0.0.1:8080"`.
    /// Trailing slashes are ignored.
    pub api_url: String,
    /// Hex-encoded secp256k1 private key used to sign proposals.
    pub private_key: String,
    /// Address of the on-chain protocol contract this node participates in.
    pub contract_address: String,
    /// Optional secondary JSON-RPC provider URL.
    pub provider_url: String,
    pub transport: TransportConfig,
    pub consensus: LoopConfig,
}

impl ClientConfig {
    /// Builds a configuration with default session and loop settings.
    pub fn new(
        api_url: impl Into<String>,
        private_key: impl Into<String>,
        contract_address: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            private_key: private_key.into(),
            contract_address: contract_address.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".to_string(),
            private_key: String::new(),
            contract_address: String::new(),
            provider_url: "http://localhost:8545".to_string(),
            transport: TransportConfig::default(),
            consensus: LoopConfig::default(),
        }
    }
}
