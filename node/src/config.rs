//! Node configuration.
//!
//! Everything is read from `SYNAPSE_*` environment variables on top of the
//! library defaults. Only the private key and contract address are
//! required.

use std::net::SocketAddr;
use std::time::Duration;

use synapse::{ClientConfig, MetricsConfig};

pub const API_URL: &str = "SYNAPSE_API_URL";
pub const PRIVATE_KEY: &str = "SYNAPSE_PRIVATE_KEY";
pub const CONTRACT_ADDRESS: &str = "SYNAPSE_CONTRACT_ADDRESS";
pub const PROVIDER_URL: &str = "SYNAPSE_PROVIDER_URL";
pub const INTERVAL_SECS: &str = "SYNAPSE_INTERVAL_SECS";
pub const METRICS_ADDR: &str = "SYNAPSE_METRICS_ADDR";
pub const METRICS_ENABLED: &str = "SYNAPSE_METRICS_ENABLED";

/// Configuration for the node binary.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub client: ClientConfig,
    pub metrics: MetricsConfig,
}

impl NodeConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let private_key = get(PRIVATE_KEY).ok_or_else(|| format!("{PRIVATE_KEY} is not set"))?;
        let contract_address =
            get(CONTRACT_ADDRESS).ok_or_else(|| format!("{CONTRACT_ADDRESS} is not set"))?;

        let mut client = ClientConfig {
            private_key,
            contract_address,
            ..ClientConfig::default()
        };
        if let Some(url) = get(API_URL) {
            client.api_url = url;
        }
        if let Some(url) = get(PROVIDER_URL) {
            client.provider_url = url;
        }
        if let Some(raw) = get(INTERVAL_SECS) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|e| format!("invalid {INTERVAL_SECS} {raw:?}: {e}"))?;
            // A zero interval would spin; one second is the floor.
            client.consensus.interval = Duration::from_secs(secs.max(1));
        }

        let mut metrics = MetricsConfig::default();
        if let Some(raw) = get(METRICS_ADDR) {
            metrics.listen_addr = raw
                .trim()
                .parse::<SocketAddr>()
                .map_err(|e| format!("invalid {METRICS_ADDR} {raw:?}: {e}"))?;
        }
        if let Some(raw) = get(METRICS_ENABLED) {
            metrics.enabled = parse_bool(&raw)
                .ok_or_else(|| format!("invalid {METRICS_ENABLED} {raw:?}"))?;
        }

        Ok(Self { client, metrics })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<NodeConfig, String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NodeConfig::from_lookup(|key| map.get(key).cloned())
    }

    const IDENTITY: [(&str, &str); 2] = [(PRIVATE_KEY, "0xkey"), (CONTRACT_ADDRESS, "0xcontract")];

    #[test]
    fn identity_only_uses_defaults() {
        let cfg = load(&IDENTITY).unwrap();
        assert_eq!(cfg.client.private_key, "0xkey");
        assert_eq!(cfg.client.contract_address, "0xcontract");
        assert_eq!(cfg.client.api_url, "http://127.0.0.1:8080");
        assert_eq!(cfg.client.provider_url, "http://localhost:8545");
        assert_eq!(cfg.client.consensus.interval, Duration::from_secs(5));
        assert!(cfg.metrics.enabled);
    }

    #[test]
    fn missing_identity_is_an_error() {
        let err = load(&[(CONTRACT_ADDRESS, "0xcontract")]).unwrap_err();
        assert!(err.contains(PRIVATE_KEY));

        let err = load(&[(PRIVATE_KEY, "0xkey"), (CONTRACT_ADDRESS, "  ")]).unwrap_err();
        assert!(err.contains(CONTRACT_ADDRESS));
    }

    #[test]
    fn overrides_are_applied() {
        let mut vars = IDENTITY.to_vec();
        vars.extend([
            (API_URL, "http://consensus:9000/"),
            (PROVIDER_URL, "http://rpc:8545"),
            (INTERVAL_SECS, "12"),
            (METRICS_ADDR, "0.0.0.0:9100"),
            (METRICS_ENABLED, "off"),
        ]);
        let cfg = load(&vars).unwrap();
        assert_eq!(cfg.client.api_url, "http://consensus:9000/");
        assert_eq!(cfg.client.provider_url, "http://rpc:8545");
        assert_eq!(cfg.client.consensus.interval, Duration::from_secs(12));
        assert_eq!(cfg.metrics.listen_addr, "0.0.0.0:9100".parse().unwrap());
        assert!(!cfg.metrics.enabled);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let mut vars = IDENTITY.to_vec();
        vars.push((INTERVAL_SECS, "0"));
        let cfg = load(&vars).unwrap();
        assert_eq!(cfg.client.consensus.interval, Duration::from_secs(1));
    }

    #[test]
    fn malformed_values_are_rejected() {
        for (key, value) in [
            (INTERVAL_SECS, "soon"),
            (METRICS_ADDR, "localhost"),
            (METRICS_ENABLED, "maybe"),
        ] {
            let mut vars = IDENTITY.to_vec();
            vars.push((key, value));
            let err = load(&vars).unwrap_err();
            assert!(err.contains(key), "{err}");
        }
    }
}
