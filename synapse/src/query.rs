//! On-demand operations against the consensus API.
//!
//! These calls share the client's session with the background loop but do
//! not depend on it: they may run concurrently with a round, and they
//! surface errors directly to the caller. Only
//! [`SynapseClient::submit_gradient_update`] touches the local neural
//! state.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::client::SynapseClient;
use crate::consensus::ClientError;
use crate::transport::endpoints;
use crate::types::{ConsensusMetrics, NeuralState, ReputationResponse, Tensor};

impl SynapseClient {
    /// Network-wide consensus snapshot.
    pub async fn get_consensus_metrics(&self) -> Result<ConsensusMetrics, ClientError> {
        Ok(self
            .transport
            .get_json(endpoints::CONSENSUS_METRICS)
            .await?)
    }

    /// Current network topology, as opaque JSON.
    pub async fn get_network_topology(&self) -> Result<serde_json::Value, ClientError> {
        Ok(self.transport.get_json(endpoints::TOPOLOGY).await?)
    }

    /// Reputation score of the node at `address`.
    pub async fn get_node_reputation(&self, address: &str) -> Result<f64, ClientError> {
        let resp: ReputationResponse = self
            .transport
            .get_json(&endpoints::reputation(address))
            .await?;
        Ok(resp.reputation)
    }

    /// Signs and submits a new neural state built from `gradients`.
    ///
    /// When `weights` is `None` the weights of the currently held state are
    /// reused; if there is no held state either, this fails with
    /// [`ClientError::NoWeights`] before any request is made. The new state
    /// has version `previous + 1` (or `0` without a previous state) and the
    /// current timestamp; a previous version of `u64::MAX` fails with
    /// [`ClientError::VersionExhausted`]. It replaces the held state only after the service
    /// accepted it with a 2xx status.
    ///
    /// The state slot's writer lock is held for the whole sequence, so a
    /// concurrent sync cannot land between reading the previous version and
    /// committing the new one.
    pub async fn submit_gradient_update(
        &self,
        gradients: Tensor,
        weights: Option<Tensor>,
    ) -> Result<Arc<NeuralState>, ClientError> {
        let writer = self.state.lock_writer().await;
        let previous = writer.current();

        let weights = match (weights, previous.as_deref()) {
            (Some(w), _) => w,
            (None, Some(prev)) => prev.weights.clone(),
            (None, None) => return Err(ClientError::NoWeights),
        };
        let version = match previous.as_deref() {
            Some(prev) => prev
                .version
                .checked_add(1)
                .ok_or(ClientError::VersionExhausted)?,
            None => 0,
        };

        let state = NeuralState::signed(
            weights,
            gradients,
            current_unix_timestamp(),
            version,
            self.signer.as_ref(),
        )?;

        self.transport
            .post_ack(endpoints::UPDATE_STATE, &state)
            .await?;

        let committed = writer.commit(state);
        self.metrics
            .consensus
            .neural_state_version
            .set(i64::try_from(committed.version).unwrap_or(i64::MAX));
        tracing::info!(version = committed.version, "gradient update accepted");

        Ok(committed)
    }
}

/// Returns the current wall-clock time as seconds since Unix epoch.
///
/// On error (system clock before epoch) this falls back to 0.
fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_after_2020() {
        assert!(current_unix_timestamp() > 1_577_836_800);
    }
}
