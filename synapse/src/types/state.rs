// synapse/src/types/state.rs

//! Neural state and the snapshots exchanged with the consensus service.
//!
//! The JSON shape of [`NeuralState`] is the one served by
//! `GET /v1/neural_state/latest` and accepted by
//! `POST /v1/neural_state/update`:
//!
//! ```json
//! {
//!   "weights": [1.0, 2.0],
//!   "gradients": [0.1, 0.2],
//!   "timestamp": 1000,
//!   "version": 3,
//!   "signature": "abc"
//! }
//! ```
//!
//! The signing payload ([`NeuralState::signing_payload`]) is a wire format
//! shared with the remote verifier. Changing the element order, the element
//! encoding or the metadata string breaks signature verification on the
//! other side.

use serde::{Deserialize, Serialize};

use super::{Hash256, Tensor};
use crate::crypto::{CryptoError, MessageSigner};

/// Versioned weights/gradients payload synchronised across participants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeuralState {
    /// Model weights.
    pub weights: Tensor,
    /// Gradients; expected to be shape-compatible with `weights`, which is
    /// not checked here.
    pub gradients: Tensor,
    /// Seconds since Unix epoch.
    pub timestamp: u64,
    /// Monotonic version; each local update uses `previous + 1`.
    pub version: u64,
    /// Hex-encoded recoverable signature over [`Self::signing_hash`].
    /// Empty until computed.
    #[serde(default)]
    pub signature: String,
}

impl NeuralState {
    /// Builds an unsigned state.
    pub fn unsigned(weights: Tensor, gradients: Tensor, timestamp: u64, version: u64) -> Self {
        Self {
            weights,
            gradients,
            timestamp,
            version,
            signature: String::new(),
        }
    }

    /// Builds a state and signs it with `signer`.
    pub fn signed<S>(
        weights: Tensor,
        gradients: Tensor,
        timestamp: u64,
        version: u64,
        signer: &S,
    ) -> Result<Self, CryptoError>
    where
        S: MessageSigner + ?Sized,
    {
        let mut state = Self::unsigned(weights, gradients, timestamp, version);
        state.signature = state.sign(signer)?;
        Ok(state)
    }

    /// Canonical bytes covered by the signature.
    ///
    /// Layout: little-endian `f64` weights (row-major), little-endian `f64`
    /// gradients (row-major), then the UTF-8 string `"<timestamp>:<version>"`.
    /// The `signature` field is never part of the payload.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity((self.weights.len() + self.gradients.len()) * 8 + 24);
        self.weights.write_le_bytes(&mut out);
        self.gradients.write_le_bytes(&mut out);
        out.extend_from_slice(format!("{}:{}", self.timestamp, self.version).as_bytes());
        out
    }

    /// Keccak-256 of [`Self::signing_payload`].
    pub fn signing_hash(&self) -> Hash256 {
        Hash256::compute(&self.signing_payload())
    }

    /// Signs the current signing hash and returns the hex signature without
    /// attaching it.
    pub fn sign<S>(&self, signer: &S) -> Result<String, CryptoError>
    where
        S: MessageSigner + ?Sized,
    {
        let hash = self.signing_hash();
        Ok(signer.sign_message(hash.as_bytes())?.to_hex())
    }

    /// Returns `true` once a signature has been attached.
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

/// Read-only network-wide consensus snapshot (`GET /v1/consensus/metrics`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsensusMetrics {
    pub total_nodes: u64,
    pub active_nodes: u64,
    /// Conventionally in `[0, 1]`; not enforced.
    pub average_reputation: f64,
    /// Conventionally in `[0, 1]`; not enforced.
    pub consensus_health: f64,
    pub last_block_height: u64,
}

/// Liveness readings reported by this node (`POST /v1/metrics`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub cpu_utilization: f64,
    pub memory_usage: f64,
    pub neural_compute: f64,
    pub bandwidth: f64,
}

/// Body of `GET /v1/nodes/{address}/reputation`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct ReputationResponse {
    pub reputation: f64,
}
