//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed consensus-loop metrics, and an
//! async HTTP exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Consensus-loop Prometheus metrics.
///
/// Loop failures never propagate to callers, so these counters (together
/// with the logs) are how a failing node becomes visible.
#[derive(Clone)]
pub struct LoopMetrics {
    /// Completed consensus rounds, successful or not.
    pub rounds_total: IntCounter,
    /// Failed steps, labelled by `step` (`propose`, `sync`, `report`).
    pub step_failures_total: IntCounterVec,
    /// Proposals accepted by the service.
    pub proposals_total: IntCounter,
    /// Successful neural-state syncs.
    pub state_syncs_total: IntCounter,
    /// Metrics reports answered with a non-2xx status.
    pub reports_rejected_total: IntCounter,
    /// Version of the locally held neural state (`-1` when absent).
    pub neural_state_version: IntGauge,
    /// Wall-clock duration of a full round, in seconds.
    pub round_duration_seconds: Histogram,
}

impl LoopMetrics {
    /// Registers consensus-loop metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let rounds_total = IntCounter::with_opts(Opts::new(
            "consensus_rounds_total",
            "Total number of consensus rounds executed",
        ))?;
        registry.register(Box::new(rounds_total.clone()))?;

        let step_failures_total = IntCounterVec::new(
            Opts::new(
                "consensus_step_failures_total",
                "Total number of failed consensus round steps",
            ),
            &["step"],
        )?;
        registry.register(Box::new(step_failures_total.clone()))?;

        let proposals_total = IntCounter::with_opts(Opts::new(
            "consensus_proposals_total",
            "Total number of neural state proposals accepted by the service",
        ))?;
        registry.register(Box::new(proposals_total.clone()))?;

        let state_syncs_total = IntCounter::with_opts(Opts::new(
            "neural_state_syncs_total",
            "Total number of successful neural state syncs",
        ))?;
        registry.register(Box::new(state_syncs_total.clone()))?;

        let reports_rejected_total = IntCounter::with_opts(Opts::new(
            "node_metrics_reports_rejected_total",
            "Total number of node metrics reports rejected by the service",
        ))?;
        registry.register(Box::new(reports_rejected_total.clone()))?;

        let neural_state_version = IntGauge::with_opts(Opts::new(
            "neural_state_version",
            "Version of the locally held neural state (-1 when absent)",
        ))?;
        neural_state_version.set(-1);
        registry.register(Box::new(neural_state_version.clone()))?;

        let round_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "consensus_round_duration_seconds",
                "Time to run one propose/sync/report round in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
        )?;
        registry.register(Box::new(round_duration_seconds.clone()))?;

        Ok(Self {
            rounds_total,
            step_failures_total,
            proposals_total,
            state_syncs_total,
            reports_rejected_total,
            neural_state_version,
            round_duration_seconds,
        })
    }
}

/// Wrapper around a Prometheus registry and the loop metrics.
///
/// This is the main handle passed to the client. It can be wrapped in an
/// [`Arc`] and shared across tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub consensus: LoopMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// (metric names prefixed with `synapse_`) and registers the loop
    /// metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("synapse".to_string()), None)?;
        let consensus = LoopMetrics::register(&registry)?;
        Ok(Self {
            registry,
            consensus,
        })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
///
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new()?);
/// let addr: SocketAddr = "127.0.0.1:9899".parse()?;
/// tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
/// ```
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    Ok(route(req.method(), req.uri().path(), &metrics))
}

fn route(method: &Method, path: &str, metrics: &MetricsRegistry) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/metrics") => {
            let mut resp = Response::new(Full::new(Bytes::from(metrics.gather_text())));
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            resp
        }
        _ => {
            let mut resp = Response::new(Full::new(Bytes::from("not found")));
            *resp.status_mut() = StatusCode::NOT_FOUND;
            resp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = LoopMetrics::register(&registry).expect("register metrics");

        metrics.rounds_total.inc();
        metrics.step_failures_total.with_label_values(&["sync"]).inc();
        metrics.neural_state_version.set(4);
        metrics.round_duration_seconds.observe(0.02);

        assert_eq!(metrics.rounds_total.get(), 1);
        assert_eq!(
            metrics.step_failures_total.with_label_values(&["sync"]).get(),
            1
        );
        assert!(!registry.gather().is_empty());
    }

    #[test]
    fn registering_twice_in_one_registry_fails() {
        let registry = Registry::new();
        LoopMetrics::register(&registry).expect("first registration");
        assert!(LoopMetrics::register(&registry).is_err());
    }

    #[test]
    fn metrics_registry_gather_text_uses_prefix() {
        let registry = MetricsRegistry::new().expect("create metrics registry");
        registry.consensus.rounds_total.inc();
        let text = registry.gather_text();
        assert!(text.contains("synapse_consensus_rounds_total 1"), "{text}");
        assert!(text.contains("synapse_neural_state_version -1"), "{text}");
    }

    #[test]
    fn exporter_routes_only_metrics_path() {
        let registry = MetricsRegistry::new().unwrap();

        let ok = route(&Method::GET, "/metrics", &registry);
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(
            ok.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4"
        );

        let missing = route(&Method::GET, "/other", &registry);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let wrong_method = route(&Method::POST, "/metrics", &registry);
        assert_eq!(wrong_method.status(), StatusCode::NOT_FOUND);
    }
}
