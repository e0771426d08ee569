//! Authenticated HTTP session to the Synapse consensus API.
//!
//! The transport owns one `reqwest` client whose default headers identify
//! this node (`X-API-Key: <address>`). It exposes verb-scoped JSON
//! operations and translates failures into [`TransportError`]. Retry
//! policy is left to callers: the consensus loop paces itself with a fixed
//! interval, and facade calls surface errors directly.

use std::fmt;

use reqwest::StatusCode;

pub mod http;

pub use http::HttpTransport;

/// Paths of the consensus API endpoints consumed by the client.
pub mod endpoints {
    pub const PROPOSE: &str = "/v1/consensus/propose";
    pub const LATEST_STATE: &str = "/v1/neural_state/latest";
    pub const UPDATE_STATE: &str = "/v1/neural_state/update";
    pub const NODE_METRICS: &str = "/v1/metrics";
    pub const CONSENSUS_METRICS: &str = "/v1/consensus/metrics";
    pub const TOPOLOGY: &str = "/v1/network/topology";

    /// `/v1/nodes/{address}/reputation`
    pub fn reputation(address: &str) -> String {
        format!("/v1/nodes/{address}/reputation")
    }
}

/// Errors that can occur while talking to the consensus API.
#[derive(Debug)]
pub enum TransportError {
    /// The HTTP client could not be constructed (bad header value, TLS
    /// backend initialisation, ...).
    Build(String),
    /// Transport-level failure (connection refused, timeout, ...).
    Request(String),
    /// The service answered with a non-2xx status.
    Status { status: StatusCode, body: String },
    /// The service answered 2xx with a body that does not match the
    /// expected schema.
    Decode(String),
    /// The session was closed by `disconnect`; no request was sent.
    Closed,
}

impl TransportError {
    /// HTTP status for [`TransportError::Status`], if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Build(msg) => write!(f, "failed to build HTTP client: {msg}"),
            TransportError::Request(msg) => write!(f, "request failed: {msg}"),
            TransportError::Status { status, body } => {
                write!(f, "service returned HTTP status {status}: {body}")
            }
            TransportError::Decode(msg) => write!(f, "failed to parse JSON response: {msg}"),
            TransportError::Closed => write!(f, "session is closed"),
        }
    }
}

impl std::error::Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reputation_path_embeds_address() {
        assert_eq!(
            endpoints::reputation("0xabc"),
            "/v1/nodes/0xabc/reputation"
        );
    }

    #[test]
    fn status_error_display_carries_body() {
        let err = TransportError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream down".to_string(),
        };
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        let text = err.to_string();
        assert!(text.contains("502"), "{text}");
        assert!(text.contains("upstream down"), "{text}");
    }
}
