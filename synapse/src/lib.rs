//! Synapse client library crate.
//!
//! This crate provides the client side of the Synapse neural-state
//! consensus network:
//!
//! - strongly-typed domain types (`types`),
//! - the hashing/signing adapter (`crypto`),
//! - the authenticated HTTP session (`transport`),
//! - the background consensus loop (`consensus`),
//! - on-demand queries and gradient updates (`query`),
//! - the connect/disconnect lifecycle (`client`),
//! - injected resource readings (`telemetry`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level client configuration (`config`).
//!
//! ```ignore
//! use std::sync::Arc;
//! use synapse::{ClientConfig, NullProbe, SynapseClient, Tensor};
//!
//! let cfg = ClientConfig::new("http://127.0.0.1:8080", private_key, contract);
//! let client = SynapseClient::connect(cfg, Arc::new(NullProbe)).await?;
//!
//! let state = client
//!     .submit_gradient_update(Tensor::from_vec(vec![0.5]), None)
//!     .await?;
//! println!("now at version {}", state.version);
//!
//! client.disconnect().await;
//! ```

pub mod client;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod metrics;
pub mod query;
pub mod telemetry;
pub mod transport;
pub mod types;

// Re-export top-level configuration types.
pub use config::{ClientConfig, LoopConfig, MetricsConfig, TransportConfig};

// Re-export the client and loop observability types.
pub use client::SynapseClient;
pub use consensus::{ClientError, LoopPhase, RoundSummary, Step, StepOutcome};

// Re-export signing and transport interfaces.
pub use crypto::{CryptoError, LocalSigner, MessageSigner, RecoverableSignature, recover_signer};
pub use transport::{HttpTransport, TransportError};

// Re-export the resource probe capability.
pub use telemetry::{NullProbe, ResourceProbe, StaticProbe};

// Re-export metrics registry and exporter.
pub use metrics::{LoopMetrics, MetricsRegistry, run_prometheus_http_server};

// Re-export domain types at the crate root for convenience.
pub use types::*;
