//! Upstream PromptHouse API client.
//!
//! Every message that is not answered locally is POSTed as-is to the
//! configured endpoint with the access link as a query parameter. The body
//! that comes back is the JSON-RPC response relayed to the client.
//!
//! # Timeouts and Retries
//!
//! Each call runs inside a single timeout scope. When it elapses the
//! in-flight future is dropped, which aborts the HTTP exchange; other calls
//! are unaffected. Connection failures (the request never reached the
//! server) are retried with a linear backoff inside that same scope, so a
//! call never outlives its timeout. Anything that may have reached the
//! server is never retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::error::UpstreamError;

/// `User-Agent` sent with every upstream request.
pub const USER_AGENT: &str = concat!("PromptHouse-MCP/", env!("CARGO_PKG_VERSION"));

/// Characters of an error body kept in [`UpstreamError::Status`].
const EXCERPT_CHARS: usize = 200;

/// Delay before the first retry; later retries wait proportionally longer.
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Sends JSON-RPC messages upstream.
///
/// The relay depends on this trait rather than on [`UpstreamClient`] so tests
/// can substitute an in-process fake.
#[async_trait]
pub trait UpstreamForwarder: Send + Sync {
    /// Sends `message` and returns the upstream's JSON-RPC response.
    async fn send(&self, message: &Value) -> Result<Value, UpstreamError>;
}

/// HTTP client for the PromptHouse API.
///
/// Not `Debug`: the request URL carries the access link.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    /// Request URL including the access link.
    url: Url,
    /// Credential-free form of `url`, safe to log.
    endpoint: String,
    timeout: Duration,
    retries: u32,
}

impl UpstreamClient {
    /// Creates a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &RelayConfig) -> Result<Self, UpstreamError> {
        let url = config.endpoint.request_url(&config.access_link)?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.timeout)
            .build()
            .map_err(UpstreamError::Client)?;

        Ok(Self {
            client,
            url,
            endpoint: config.endpoint.to_string(),
            timeout: config.timeout,
            retries: config.retries,
        })
    }

    /// The endpoint this client talks to, without the access link.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends a message and returns the normalised response.
    ///
    /// # Errors
    ///
    /// See [`UpstreamError`] for the distinct failure conditions.
    pub async fn send(&self, message: &Value) -> Result<Value, UpstreamError> {
        let method = message.get("method").and_then(Value::as_str);
        debug!(endpoint = %self.endpoint, method, "Forwarding message upstream");

        let body = tokio::time::timeout(self.timeout, self.send_with_retries(message))
            .await
            .map_err(|_| {
                warn!(
                    endpoint = %self.endpoint,
                    method,
                    timeout_ms = self.timeout_ms(),
                    "Upstream request timed out"
                );
                UpstreamError::Timeout {
                    timeout_ms: self.timeout_ms(),
                }
            })??;

        normalize_response(body, message.get("id"))
    }

    async fn send_with_retries(&self, message: &Value) -> Result<Value, UpstreamError> {
        let mut attempt = 0;
        loop {
            match self.exchange(message).await {
                Err(UpstreamError::Transport(e)) if e.is_connect() && attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        endpoint = %self.endpoint,
                        attempt,
                        retries = self.retries,
                        error = %e,
                        "Upstream connection failed, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                other => return other,
            }
        }
    }

    /// One HTTP round trip.
    async fn exchange(&self, message: &Value) -> Result<Value, UpstreamError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(message)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.without_url()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.without_url()))?;

        debug!(status = status.as_u16(), bytes = text.len(), "Upstream responded");

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                excerpt: excerpt(&text),
            });
        }

        if text.trim().is_empty() {
            return Err(UpstreamError::EmptyResponse);
        }

        serde_json::from_str(&text).map_err(UpstreamError::InvalidJson)
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

#[async_trait]
impl UpstreamForwarder for UpstreamClient {
    async fn send(&self, message: &Value) -> Result<Value, UpstreamError> {
        Self::send(self, message).await
    }
}

/// Ensures an upstream response is a JSON-RPC object carrying `jsonrpc` and
/// the originating request's `id`.
///
/// # Errors
///
/// Returns [`UpstreamError::UnexpectedBody`] if `body` is not an object.
pub fn normalize_response(mut body: Value, request_id: Option<&Value>) -> Result<Value, UpstreamError> {
    let obj = body.as_object_mut().ok_or(UpstreamError::UnexpectedBody)?;

    obj.entry("jsonrpc")
        .or_insert_with(|| Value::String("2.0".to_string()));

    if let Some(id) = request_id {
        if obj.get("id").map_or(true, Value::is_null) {
            obj.insert("id".to_string(), id.clone());
        }
    }

    Ok(body)
}

fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let mut out: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::{AccessLink, Endpoint, Mode};

    fn config_for(uri: &str, timeout: Duration, retries: u32) -> RelayConfig {
        RelayConfig {
            mode: Mode::Custom,
            endpoint: Endpoint::from_url(&format!("{uri}/mcp-link")).unwrap(),
            access_link: AccessLink::new("test-link").unwrap(),
            debug: false,
            timeout,
            retries,
            log_level: "warn".to_string(),
        }
    }

    fn client_for(server: &MockServer) -> UpstreamClient {
        UpstreamClient::new(&config_for(&server.uri(), Duration::from_secs(5), 0)).unwrap()
    }

    fn ping() -> Value {
        json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": {"name": "get_prompt_list"}})
    }

    #[test]
    fn user_agent_names_relay() {
        assert!(USER_AGENT.starts_with("PromptHouse-MCP/"));
    }

    #[test]
    fn normalize_injects_missing_fields() {
        let body = json!({"result": {"ok": true}});
        let out = normalize_response(body, Some(&json!(3))).unwrap();
        assert_eq!(out, json!({"jsonrpc": "2.0", "id": 3, "result": {"ok": true}}));
    }

    #[test]
    fn normalize_keeps_upstream_fields() {
        let body = json!({"jsonrpc": "2.0", "id": "u", "result": {}});
        let out = normalize_response(body.clone(), Some(&json!(3))).unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn normalize_replaces_null_id() {
        let body = json!({"jsonrpc": "2.0", "id": null, "result": {}});
        let out = normalize_response(body, Some(&json!("abc"))).unwrap();
        assert_eq!(out["id"], "abc");
    }

    #[test]
    fn normalize_rejects_non_object() {
        let result = normalize_response(json!([1, 2]), None);
        assert!(matches!(result, Err(UpstreamError::UnexpectedBody)));
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "x".repeat(500);
        let cut = excerpt(&long);
        assert_eq!(cut.len(), EXCERPT_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(excerpt("short"), "short");
    }

    #[tokio::test]
    async fn forwards_message_with_access_link() {
        let server = MockServer::start().await;
        let reply = json!({"jsonrpc": "2.0", "id": 7, "result": {"ok": true}});
        Mock::given(method("POST"))
            .and(path("/mcp-link"))
            .and(query_param("accessLink", "test-link"))
            .and(header("content-type", "application/json"))
            .and(header("user-agent", USER_AGENT))
            .and(body_json(ping()))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = client.send(&ping()).await.unwrap();
        assert_eq!(response, reply);
    }

    #[tokio::test]
    async fn injects_jsonrpc_and_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = client.send(&ping()).await.unwrap();
        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["id"], 7);
    }

    #[tokio::test]
    async fn empty_body_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  \n"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.send(&ping()).await;
        assert!(matches!(result, Err(UpstreamError::EmptyResponse)));
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid access link"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        match client.send(&ping()).await {
            Err(UpstreamError::Status { status, excerpt }) => {
                assert_eq!(status, 401);
                assert_eq!(excerpt, "invalid access link");
            }
            other => panic!("Expected Status error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.send(&ping()).await;
        assert!(matches!(result, Err(UpstreamError::InvalidJson(_))));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"jsonrpc": "2.0", "id": 7, "result": {}}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = config_for(&server.uri(), Duration::from_millis(200), 0);
        let client = UpstreamClient::new(&config).unwrap();

        let started = std::time::Instant::now();
        let result = client.send(&ping()).await;
        assert!(matches!(
            result,
            Err(UpstreamError::Timeout { timeout_ms: 200 })
        ));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = config_for(&format!("http://127.0.0.1:{port}"), Duration::from_secs(5), 1);
        let client = UpstreamClient::new(&config).unwrap();

        let result = client.send(&ping()).await;
        assert!(matches!(result, Err(UpstreamError::Transport(_))));
    }
}
