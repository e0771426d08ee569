//! Client lifecycle: connect, background loop, disconnect.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::consensus::{ClientError, ConsensusLoop, LoopPhase, RoundSummary, StateSlot};
use crate::crypto::{LocalSigner, MessageSigner};
use crate::metrics::MetricsRegistry;
use crate::telemetry::ResourceProbe;
use crate::transport::HttpTransport;
use crate::types::{Address, NeuralState};

/// A connected participant in the Synapse consensus network.
///
/// `connect` opens the authenticated HTTP session and spawns the
/// background consensus loop; the query facade (see the `query` module)
/// can be used concurrently from any task. `SynapseClient` is
/// `Send + Sync`; wrap it in an [`Arc`] to share it.
///
/// Call [`SynapseClient::disconnect`] for an orderly shutdown. Dropping the
/// client without disconnecting still stops the loop at its next
/// suspension point.
pub struct SynapseClient {
    pub(crate) transport: Arc<HttpTransport>,
    pub(crate) signer: Arc<dyn MessageSigner>,
    pub(crate) state: Arc<StateSlot>,
    pub(crate) metrics: Arc<MetricsRegistry>,
    contract_address: Address,
    provider_url: String,
    phase: watch::Receiver<LoopPhase>,
    rounds: watch::Receiver<RoundSummary>,
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SynapseClient {
    /// Connects with a private metrics registry.
    pub async fn connect(
        cfg: ClientConfig,
        probe: Arc<dyn ResourceProbe>,
    ) -> Result<Self, ClientError> {
        let metrics =
            MetricsRegistry::new().map_err(|e| ClientError::Metrics(e.to_string()))?;
        Self::connect_with(cfg, probe, Arc::new(metrics)).await
    }

    /// Connects, recording loop metrics into `metrics`.
    ///
    /// The private key and contract address are validated before anything
    /// is spawned; a malformed key is fatal here rather than on the first
    /// round.
    pub async fn connect_with(
        cfg: ClientConfig,
        probe: Arc<dyn ResourceProbe>,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<Self, ClientError> {
        let signer = Arc::new(LocalSigner::from_hex(&cfg.private_key)?);
        let contract_address = cfg
            .contract_address
            .parse::<Address>()
            .map_err(|e| ClientError::InvalidConfig(format!("contract address: {e}")))?;

        let transport = Arc::new(HttpTransport::connect(
            cfg.api_url.clone(),
            &signer.address().to_string(),
            &cfg.transport,
        )?);
        let state = Arc::new(StateSlot::new());

        let worker = ConsensusLoop::new(
            transport.clone(),
            signer.clone(),
            state.clone(),
            probe,
            metrics.clone(),
            &cfg.consensus,
        );
        let phase = worker.subscribe_phase();
        let rounds = worker.subscribe_rounds();

        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(worker.run(stop_rx));

        tracing::info!(
            api_url = %transport.base_url(),
            address = %signer.address(),
            contract = %contract_address,
            "connected to Synapse Protocol network"
        );

        Ok(Self {
            transport,
            signer,
            state,
            metrics,
            contract_address,
            provider_url: cfg.provider_url,
            phase,
            rounds,
            stop,
            task: Mutex::new(Some(task)),
        })
    }

    /// Stops the consensus loop, waits for it to finish, then closes the
    /// session and discards the local neural state.
    ///
    /// Any request the loop had in flight is abandoned. This never fails
    /// and is safe to call more than once; facade calls made afterwards
    /// return a `Closed` transport error without sending anything.
    pub async fn disconnect(&self) {
        self.stop.send_replace(true);

        let mut task = self.task.lock().await;
        if let Some(handle) = task.take() {
            match handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => tracing::error!("consensus loop task failed: {e}"),
            }
        }

        self.transport.close();
        self.state.clear().await;
        self.metrics.consensus.neural_state_version.set(-1);
        tracing::info!("disconnected from Synapse Protocol network");
    }

    /// `false` once `disconnect` has run.
    pub fn is_connected(&self) -> bool {
        !self.transport.is_closed()
    }

    /// Address identifying this node (sent as the API key).
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub fn provider_url(&self) -> &str {
        &self.provider_url
    }

    /// Currently held neural state, if any.
    pub fn neural_state(&self) -> Option<Arc<NeuralState>> {
        self.state.get()
    }

    /// Current phase of the consensus loop.
    pub fn phase(&self) -> LoopPhase {
        *self.phase.borrow()
    }

    /// Receiver tracking the consensus loop phase.
    pub fn subscribe_phase(&self) -> watch::Receiver<LoopPhase> {
        self.phase.clone()
    }

    /// Receiver tracking the latest round summary.
    pub fn subscribe_rounds(&self) -> watch::Receiver<RoundSummary> {
        self.rounds.clone()
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }
}
