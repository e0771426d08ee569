//! `reqwest`-based session to the consensus API.
//!
//! Every request carries the node address in the configured API-key header
//! (default `X-API-Key`). JSON bodies are sent with `Content-Type:
//! application/json`; responses are parsed as JSON only after a 2xx
//! status, otherwise the raw response text is kept in
//! [`TransportError::Status`].

use std::future::Future;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use super::TransportError;
use crate::config::TransportConfig;

/// HTTP session bound to one base URL and one node identity.
///
/// This client is thread-safe (`Send + Sync`) and is shared between the
/// consensus loop and facade callers behind an `Arc`. Once
/// [`HttpTransport::close`] has been called every request fails with
/// [`TransportError::Closed`]: new requests are never sent, and requests
/// already in flight are abandoned.
pub struct HttpTransport {
    base_url: String,
    client: Client,
    closed: watch::Sender<bool>,
}

impl HttpTransport {
    /// Opens a session against `base_url` that identifies itself with
    /// `api_key` (the node address).
    pub fn connect(
        base_url: impl Into<String>,
        api_key: &str,
        cfg: &TransportConfig,
    ) -> Result<Self, TransportError> {
        let header_name = HeaderName::from_bytes(cfg.api_key_header.as_bytes())
            .map_err(|e| TransportError::Build(format!("invalid header name: {e}")))?;
        let header_value = HeaderValue::from_str(api_key)
            .map_err(|e| TransportError::Build(format!("invalid header value: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(header_name, header_value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(cfg.timeout)
            .connect_timeout(cfg.connect_timeout)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            closed: watch::Sender::new(false),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        // Avoid accidental double slashes.
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Drives `request` unless the session is, or becomes, closed.
    ///
    /// The close signal is polled first, so a request on an already closed
    /// session is never started.
    async fn guarded<T, F>(&self, request: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let mut closed = self.closed.subscribe();
        tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => Err(TransportError::Closed),
            res = request => res,
        }
    }

    /// `GET path`, expecting a 2xx JSON body of type `T`.
    pub async fn get_json<T>(&self, path: &str) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        self.guarded(async {
            tracing::trace!(%url, "GET");
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| TransportError::Request(format!("HTTP GET {url} failed: {e}")))?;

            decode_json(check_status(resp).await?).await
        })
        .await
    }

    /// `POST path` with a JSON body, requiring a 2xx status and ignoring
    /// the response body.
    pub async fn post_ack<B>(&self, path: &str, body: &B) -> Result<(), TransportError>
    where
        B: Serialize + ?Sized,
    {
        self.guarded(async {
            let resp = self.send_post(path, body).await?;
            check_status(resp).await?;
            Ok(())
        })
        .await
    }

    /// `POST path` with a JSON body and no status handling. Callers that
    /// treat non-2xx as a soft failure inspect the response themselves.
    pub async fn post<B>(&self, path: &str, body: &B) -> Result<Response, TransportError>
    where
        B: Serialize + ?Sized,
    {
        self.guarded(self.send_post(path, body)).await
    }

    async fn send_post<B>(&self, path: &str, body: &B) -> Result<Response, TransportError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        tracing::trace!(%url, "POST");

        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Request(format!("HTTP POST {url} failed: {e}")))
    }

    /// Marks the session closed and abandons every request in flight.
    /// Idempotent.
    ///
    /// Connections pooled by the underlying client are released when the
    /// last handle to this transport is dropped.
    pub fn close(&self) {
        let newly_closed = self
            .closed
            .send_if_modified(|closed| !std::mem::replace(closed, true));
        if newly_closed {
            tracing::debug!(base_url = %self.base_url, "HTTP session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// Converts a non-2xx response into [`TransportError::Status`] carrying the
/// raw response text.
pub async fn check_status(resp: Response) -> Result<Response, TransportError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    Err(TransportError::Status { status, body })
}

async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, TransportError> {
    resp.json::<T>()
        .await
        .map_err(|e| TransportError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(base_url: &str) -> HttpTransport {
        HttpTransport::connect(base_url, "0xNODE", &TransportConfig::default())
            .expect("transport should build")
    }

    #[test]
    fn endpoint_avoids_double_slashes() {
        let t = transport("http://127.0.0.1:8080///");
        assert_eq!(t.base_url(), "http://127.0.0.1:8080");
        assert_eq!(
            t.endpoint("/v1/metrics"),
            "http://127.0.0.1:8080/v1/metrics"
        );
        assert_eq!(t.endpoint("v1/metrics"), "http://127.0.0.1:8080/v1/metrics");
    }

    #[test]
    fn invalid_api_key_is_a_build_error() {
        let err = HttpTransport::connect("http://x", "bad\nvalue", &TransportConfig::default())
            .err()
            .expect("newline is not a valid header value");
        assert!(matches!(err, TransportError::Build(_)));
    }

    #[tokio::test]
    async fn get_json_sends_api_key_and_parses_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/network/topology"))
            .and(header("X-API-Key", "0xNODE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"peers": 3})))
            .expect(1)
            .mount(&server)
            .await;

        let t = transport(&server.uri());
        let body: serde_json::Value = t.get_json("/v1/network/topology").await.unwrap();
        assert_eq!(body, json!({"peers": 3}));
    }

    #[tokio::test]
    async fn non_success_status_keeps_response_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/neural_state/update"))
            .and(body_json(json!({"a": 1})))
            .respond_with(ResponseTemplate::new(409).set_body_string("stale version"))
            .mount(&server)
            .await;

        let t = transport(&server.uri());
        let err = t
            .post_ack("/v1/neural_state/update", &json!({"a": 1}))
            .await
            .unwrap_err();

        match err {
            TransportError::Status { status, body } => {
                assert_eq!(status.as_u16(), 409);
                assert_eq!(body, "stale version");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/consensus/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let t = transport(&server.uri());
        let err = t
            .get_json::<serde_json::Value>("/v1/consensus/metrics")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)), "{err:?}");
    }

    #[tokio::test]
    async fn close_abandons_request_in_flight() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let t = Arc::new(transport(&server.uri()));
        let pending = tokio::spawn({
            let t = t.clone();
            async move {
                t.get_json::<serde_json::Value>("/v1/network/topology")
                    .await
            }
        });

        tokio::time::timeout(Duration::from_secs(5), async {
            while server
                .received_requests()
                .await
                .unwrap_or_default()
                .is_empty()
            {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("request should reach the server");

        t.close();

        let res = tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .expect("close should not wait for the slow response")
            .expect("request task should not panic");
        assert!(matches!(res, Err(TransportError::Closed)), "{res:?}");
    }

    #[tokio::test]
    async fn closed_session_sends_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let t = transport(&server.uri());
        t.close();
        t.close();
        assert!(t.is_closed());

        let err = t
            .get_json::<serde_json::Value>("/v1/network/topology")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }
}
