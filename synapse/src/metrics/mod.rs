//! Metrics and instrumentation for the client.
//!
//! This module defines Prometheus-compatible metrics for the consensus
//! loop and exposes a small HTTP exporter that serves `/metrics` in
//! Prometheus text format.
//!
//! Typical usage in a node:
//!
//! ```ignore
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use synapse::metrics::{MetricsRegistry, run_prometheus_http_server};
//!
//! let registry = Arc::new(MetricsRegistry::new()?);
//! let addr: SocketAddr = "127.0.0.1:9899".parse()?;
//!
//! // Spawn the HTTP exporter in the background:
//! tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
//!
//! // Hand the same registry to the client:
//! let client = SynapseClient::connect_with(cfg, probe, registry.clone())?;
//! ```

pub mod prometheus;

pub use self::prometheus::{LoopMetrics, MetricsRegistry, run_prometheus_http_server};
