//! Synapse node binary.
//!
//! Connects a `SynapseClient` using `SYNAPSE_*` environment variables,
//! optionally exposes the loop metrics on `/metrics`, and disconnects
//! cleanly on Ctrl-C.

mod config;

use std::sync::Arc;

use tokio::signal;

use config::NodeConfig;
use synapse::{MetricsRegistry, NullProbe, SynapseClient, run_prometheus_http_server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "synapse=info,synapse_node=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cfg = NodeConfig::from_env()?;

    let metrics = Arc::new(
        MetricsRegistry::new()
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::error!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    let client = SynapseClient::connect_with(cfg.client, Arc::new(NullProbe), metrics)
        .await
        .map_err(|e| format!("failed to connect: {e}"))?;

    tracing::info!(
        address = %client.address(),
        provider = client.provider_url(),
        "node running, press Ctrl-C to stop"
    );

    shutdown_signal().await;
    client.disconnect().await;

    Ok(())
}

/// Waits for Ctrl-C.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
