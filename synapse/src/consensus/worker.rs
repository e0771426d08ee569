//! Background consensus loop.
//!
//! Each round runs three steps in strict sequence:
//!
//! 1. **propose**: sign the local neural state and `POST` it to
//!    `/v1/consensus/propose` (skipped while no local state exists);
//! 2. **sync**: `GET /v1/neural_state/latest` and swap it in;
//! 3. **report**: `POST` the probe readings to `/v1/metrics`.
//!
//! Steps are independent: a failed step is logged, counted and recorded in
//! the [`RoundSummary`], and the remaining steps still run. After every
//! round the loop sleeps for the configured interval. The stop signal is
//! raced against both the round and the sleep, so an in-flight request is
//! dropped as soon as stop is requested.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;

use super::error::ClientError;
use super::round::{LoopPhase, RoundSummary, Step, StepOutcome};
use super::store::StateSlot;
use crate::config::LoopConfig;
use crate::crypto::MessageSigner;
use crate::metrics::MetricsRegistry;
use crate::telemetry::ResourceProbe;
use crate::transport::{HttpTransport, endpoints};
use crate::types::NeuralState;

/// Body of `POST /v1/consensus/propose`.
#[derive(Debug, Serialize)]
struct Proposal<'a> {
    neural_state: &'a NeuralState,
    signature: String,
}

/// Cancellable propose → sync → report loop.
pub struct ConsensusLoop {
    transport: Arc<HttpTransport>,
    signer: Arc<dyn MessageSigner>,
    state: Arc<StateSlot>,
    probe: Arc<dyn ResourceProbe>,
    metrics: Arc<MetricsRegistry>,
    interval: Duration,
    phase: watch::Sender<LoopPhase>,
    rounds: watch::Sender<RoundSummary>,
}

impl ConsensusLoop {
    pub fn new(
        transport: Arc<HttpTransport>,
        signer: Arc<dyn MessageSigner>,
        state: Arc<StateSlot>,
        probe: Arc<dyn ResourceProbe>,
        metrics: Arc<MetricsRegistry>,
        cfg: &LoopConfig,
    ) -> Self {
        let (phase, _) = watch::channel(LoopPhase::Idle);
        let (rounds, _) = watch::channel(RoundSummary::initial());
        Self {
            transport,
            signer,
            state,
            probe,
            metrics,
            interval: cfg.interval,
            phase,
            rounds,
        }
    }

    /// Receiver tracking the loop phase.
    pub fn subscribe_phase(&self) -> watch::Receiver<LoopPhase> {
        self.phase.subscribe()
    }

    /// Receiver tracking the latest [`RoundSummary`].
    pub fn subscribe_rounds(&self) -> watch::Receiver<RoundSummary> {
        self.rounds.subscribe()
    }

    /// Runs rounds until `stop` flips to `true` or its sender is dropped.
    ///
    /// Stopping is a normal exit: the loop publishes
    /// [`LoopPhase::Cancelled`] and returns.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        self.set_phase(LoopPhase::Idle);
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "consensus loop started");

        let mut round: u64 = 0;
        loop {
            if *stop.borrow() {
                break;
            }

            round += 1;
            let summary = tokio::select! {
                biased;
                _ = stop_requested(&mut stop) => None,
                summary = self.run_round(round) => Some(summary),
            };
            let Some(summary) = summary else { break };
            self.publish(summary);

            self.set_phase(LoopPhase::Sleeping);
            let stopped = tokio::select! {
                biased;
                _ = stop_requested(&mut stop) => true,
                _ = tokio::time::sleep(self.interval) => false,
            };
            if stopped {
                break;
            }
        }

        self.set_phase(LoopPhase::Cancelled);
        tracing::info!(rounds = round, "consensus loop stopped");
    }

    /// Executes one full round and returns its summary.
    pub async fn run_round(&self, round: u64) -> RoundSummary {
        let started = Instant::now();

        self.set_phase(LoopPhase::Proposing);
        let propose = self.propose_step().await;

        self.set_phase(LoopPhase::Syncing);
        let sync = self.sync_step().await;

        self.set_phase(LoopPhase::ReportingMetrics);
        let report = self.report_step().await;

        self.metrics
            .consensus
            .round_duration_seconds
            .observe(started.elapsed().as_secs_f64());

        RoundSummary {
            round,
            propose,
            sync,
            report,
            version: self.state.version(),
        }
    }

    async fn propose_step(&self) -> StepOutcome {
        let Some(state) = self.state.get() else {
            tracing::debug!("no local neural state, skipping proposal");
            return StepOutcome::Skipped;
        };

        match self.propose(&state).await {
            Ok(()) => {
                self.metrics.consensus.proposals_total.inc();
                tracing::debug!(version = state.version, "proposal accepted");
                StepOutcome::Completed
            }
            Err(e) => self.step_failed(Step::Propose, e),
        }
    }

    async fn propose(&self, state: &NeuralState) -> Result<(), ClientError> {
        let hash = state.signing_hash();
        let signature = self.signer.sign_message(hash.as_bytes())?.to_hex();
        let body = Proposal {
            neural_state: state,
            signature,
        };
        self.transport.post_ack(endpoints::PROPOSE, &body).await?;
        Ok(())
    }

    async fn sync_step(&self) -> StepOutcome {
        match self.sync().await {
            Ok(version) => {
                self.metrics.consensus.state_syncs_total.inc();
                self.metrics
                    .consensus
                    .neural_state_version
                    .set(i64::try_from(version).unwrap_or(i64::MAX));
                tracing::debug!(version, "neural state synced");
                StepOutcome::Completed
            }
            Err(e) => self.step_failed(Step::Sync, e),
        }
    }

    async fn sync(&self) -> Result<u64, ClientError> {
        let latest: NeuralState = self.transport.get_json(endpoints::LATEST_STATE).await?;
        let committed = self.state.replace(latest).await;
        Ok(committed.version)
    }

    async fn report_step(&self) -> StepOutcome {
        let readings = self.probe.snapshot();

        let resp = match self.transport.post(endpoints::NODE_METRICS, &readings).await {
            Ok(resp) => resp,
            Err(e) => return self.step_failed(Step::Report, e.into()),
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            self.metrics.consensus.reports_rejected_total.inc();
            tracing::warn!(status = status.as_u16(), %body, "failed to submit metrics");
        }
        StepOutcome::Completed
    }

    fn step_failed(&self, step: Step, err: ClientError) -> StepOutcome {
        self.metrics
            .consensus
            .step_failures_total
            .with_label_values(&[step.as_str()])
            .inc();
        tracing::error!(step = step.as_str(), error = %err, "consensus round step failed");
        StepOutcome::Failed(err.to_string())
    }

    fn publish(&self, summary: RoundSummary) {
        self.metrics.consensus.rounds_total.inc();
        if summary.is_clean() {
            tracing::debug!(round = summary.round, version = ?summary.version, "round complete");
        } else {
            tracing::warn!(round = summary.round, version = ?summary.version, "round completed with failures");
        }
        self.rounds.send_replace(summary);
    }

    fn set_phase(&self, phase: LoopPhase) {
        self.phase.send_replace(phase);
    }
}

/// Resolves once stop is requested or the stop sender is gone.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}
