use std::fmt;

use crate::crypto::CryptoError;
use crate::transport::TransportError;

/// Errors surfaced by client operations.
///
/// Facade calls return these directly to their caller. Inside the
/// consensus loop they are recorded as failed steps and never propagate.
#[derive(Debug)]
pub enum ClientError {
    /// Underlying HTTP failure (non-2xx status, network, decode, closed).
    Transport(TransportError),
    /// Signing or key handling failure.
    Crypto(CryptoError),
    /// Configuration rejected at connect time.
    InvalidConfig(String),
    /// The Prometheus registry could not be initialised.
    Metrics(String),
    /// `submit_gradient_update` was called without weights while no local
    /// neural state exists. Raised before any request is sent.
    NoWeights,
    /// The held state is already at `u64::MAX`, so no later version exists.
    /// Raised before any request is sent.
    VersionExhausted,
}

impl From<TransportError> for ClientError {
    fn from(e: TransportError) -> Self {
        ClientError::Transport(e)
    }
}

impl From<CryptoError> for ClientError {
    fn from(e: CryptoError) -> Self {
        ClientError::Crypto(e)
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "{e}"),
            ClientError::Crypto(e) => write!(f, "{e}"),
            ClientError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            ClientError::Metrics(msg) => write!(f, "metrics registry error: {msg}"),
            ClientError::NoWeights => write!(f, "no weights available for update"),
            ClientError::VersionExhausted => {
                write!(f, "neural state version cannot be incremented past u64::MAX")
            }
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Transport(e) => Some(e),
            ClientError::Crypto(e) => Some(e),
            _ => None,
        }
    }
}
