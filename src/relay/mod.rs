//! Same-origin relay for the statistics API.
//!
//! A dashboard served over HTTPS cannot call a plain-HTTP game server API
//! directly, so the relay accepts `GET /api/proxy?endpoint=/api/...`,
//! forwards it to the configured API, and hands the JSON back unchanged.
//! Failures come back as `{"error": "..."}` with a matching status code.

mod http;

use std::sync::Arc;

use anyhow::Result;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::config::RelayConfig;

pub use http::{read_request_head, write_json, HttpError, RequestHead};

/// Path the relay answers on.
pub const PROXY_PATH: &str = "/api/proxy";

const NO_STORE: (&str, &str) = ("Cache-Control", "no-store, max-age=0");

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Missing endpoint parameter")]
    MissingEndpoint,
    #[error("Invalid endpoint parameter")]
    InvalidEndpoint,
    #[error("API URL not configured")]
    NotConfigured,
    #[error("API returned {}", .0.as_u16())]
    Upstream(StatusCode),
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Bad request")]
    BadRequest,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingEndpoint | RelayError::InvalidEndpoint | RelayError::BadRequest => {
                StatusCode::BAD_REQUEST
            }
            RelayError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Upstream(status) => *status,
            RelayError::Timeout | RelayError::Transport(_) | RelayError::InvalidJson(_) => {
                StatusCode::BAD_GATEWAY
            }
            RelayError::NotFound => StatusCode::NOT_FOUND,
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Message placed in the response body.  Upstream failure detail stays in the log.
    fn public_message(&self) -> String {
        match self {
            RelayError::Timeout | RelayError::Transport(_) | RelayError::InvalidJson(_) => {
                "Failed to fetch from API".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// A response ready to be written to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Vec<u8>,
    cacheable: bool,
}

impl Reply {
    fn relayed(body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            cacheable: false,
        }
    }

    fn error(err: &RelayError) -> Self {
        Self {
            status: err.status(),
            body: json!({ "error": err.public_message() }).to_string().into_bytes(),
            cacheable: true,
        }
    }

    pub fn headers(&self) -> &'static [(&'static str, &'static str)] {
        if self.cacheable {
            &[]
        } else {
            &[NO_STORE]
        }
    }
}

pub struct Relay {
    client: Client,
    config: RelayConfig,
}

/// Bind the configured address and serve until the process exits.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind).await?;
    info!(addr = %listener.local_addr()?, upstream = ?config.api_url, "relay listening");
    Relay::new(config)?.run(listener).await
}

impl Relay {
    pub fn new(config: RelayConfig) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            config,
        })
    }

    /// Accept connections forever, one task per connection.
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        let relay = Arc::new(self);
        loop {
            let (stream, peer) = listener.accept().await?;
            let relay = Arc::clone(&relay);
            tokio::spawn(async move {
                if let Err(e) = relay.handle_connection(stream).await {
                    debug!(%peer, error = %e, "relay connection failed");
                }
            });
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream) -> std::io::Result<()> {
        let head = tokio::time::timeout(self.config.timeout, read_request_head(&mut stream)).await;
        let Ok(head) = head else {
            debug!("request head not received in time, closing");
            return Ok(());
        };
        let reply = match head {
            Ok(head) => self.respond(&head).await,
            Err(HttpError::Io(e)) => return Err(e),
            Err(e) => {
                debug!(error = %e, "rejecting unreadable request");
                Reply::error(&RelayError::BadRequest)
            }
        };
        write_json(&mut stream, reply.status, reply.headers(), &reply.body).await
    }

    /// Produce the reply for one request.
    pub async fn respond(&self, head: &RequestHead) -> Reply {
        match self.forward(head).await {
            Ok(body) => Reply::relayed(body),
            Err(e) => {
                if matches!(
                    e,
                    RelayError::Timeout | RelayError::Transport(_) | RelayError::InvalidJson(_)
                ) {
                    error!(target_path = %head.target, error = %e, "proxy error");
                } else {
                    debug!(target_path = %head.target, error = %e, "proxy request refused");
                }
                Reply::error(&e)
            }
        }
    }

    async fn forward(&self, head: &RequestHead) -> Result<Vec<u8>, RelayError> {
        if head.method != "GET" {
            return Err(RelayError::MethodNotAllowed);
        }

        // Base only gives the origin-form target something to resolve against.
        let url = Url::parse("http://relay.local")
            .and_then(|base| base.join(&head.target))
            .map_err(|_| RelayError::BadRequest)?;
        if url.path() != PROXY_PATH {
            return Err(RelayError::NotFound);
        }

        let endpoint = url
            .query_pairs()
            .find(|(key, _)| key == "endpoint")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .ok_or(RelayError::MissingEndpoint)?;

        let base = self
            .config
            .api_url
            .as_deref()
            .ok_or(RelayError::NotConfigured)?;
        let url = upstream_url(base, &endpoint)?;

        let upstream = async {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, "application/json")
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(RelayError::Upstream(status));
            }

            let body = response.bytes().await?;
            let value: Value = serde_json::from_slice(&body)?;
            Ok::<_, RelayError>(serde_json::to_vec(&value)?)
        };

        tokio::time::timeout(self.config.timeout, upstream)
            .await
            .map_err(|_| RelayError::Timeout)?
    }
}

/// `endpoint` appended to the API base.  The endpoint must be an absolute
/// path and may not move the request to another origin.
fn upstream_url(base: &str, endpoint: &str) -> Result<Url, RelayError> {
    if !endpoint.starts_with('/') {
        return Err(RelayError::InvalidEndpoint);
    }
    let origin = Url::parse(base).map_err(|_| RelayError::NotConfigured)?;
    let url = Url::parse(&format!("{base}{endpoint}")).map_err(|_| RelayError::InvalidEndpoint)?;

    let same_origin = url.scheme() == origin.scheme()
        && url.host_str() == origin.host_str()
        && url.port_or_known_default() == origin.port_or_known_default()
        && url.username() == origin.username()
        && url.password() == origin.password();
    if same_origin {
        Ok(url)
    } else {
        Err(RelayError::InvalidEndpoint)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{json_reply, unreachable_base, Canned, MockServer};

    fn relay(api_url: Option<String>, timeout: Duration) -> Relay {
        Relay::new(RelayConfig {
            bind: "127.0.0.1:0".parse().unwrap(),
            api_url,
            timeout,
        })
        .unwrap()
    }

    fn get(target: &str) -> RequestHead {
        RequestHead {
            method: "GET".into(),
            target: target.into(),
        }
    }

    fn error_body(reply: &Reply) -> Value {
        serde_json::from_slice(&reply.body).unwrap()
    }

    #[tokio::test]
    async fn missing_endpoint_is_bad_request() {
        let relay = relay(Some("http://unused".into()), Duration::from_secs(1));

        for target in ["/api/proxy", "/api/proxy?endpoint=", "/api/proxy?other=1"] {
            let reply = relay.respond(&get(target)).await;
            assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{target}");
            assert_eq!(error_body(&reply)["error"], "Missing endpoint parameter");
        }
    }

    #[tokio::test]
    async fn unconfigured_upstream_is_server_error() {
        let relay = relay(None, Duration::from_secs(1));
        let reply = relay.respond(&get("/api/proxy?endpoint=/api/server/status")).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_body(&reply)["error"], "API URL not configured");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_bad_gateway() {
        let relay = relay(Some(unreachable_base().await), Duration::from_secs(2));
        let reply = relay.respond(&get("/api/proxy?endpoint=/api/server/status")).await;
        assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
        assert_eq!(error_body(&reply)["error"], "Failed to fetch from API");
    }

    #[tokio::test]
    async fn forwards_json_and_marks_it_non_cacheable() {
        let upstream = MockServer::start(|path| match path {
            "/api/players/online" => json_reply(200, r#"{"players":[{"username":"ana"}]}"#),
            _ => json_reply(404, "{}"),
        })
        .await;
        let relay = relay(Some(upstream.base.clone()), Duration::from_secs(2));

        let reply = relay
            .respond(&get("/api/proxy?endpoint=%2Fapi%2Fplayers%2Fonline"))
            .await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.headers(), &[NO_STORE]);
        let body: Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(body, json!({ "players": [{ "username": "ana" }] }));
        assert_eq!(upstream.requested(), vec!["/api/players/online".to_string()]);
    }

    #[tokio::test]
    async fn relays_upstream_error_status() {
        let upstream = MockServer::start(|_| json_reply(503, r#"{"down":true}"#)).await;
        let relay = relay(Some(upstream.base.clone()), Duration::from_secs(2));

        let reply = relay.respond(&get("/api/proxy?endpoint=/api/server/status")).await;
        assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error_body(&reply)["error"], "API returned 503");
        assert!(reply.headers().is_empty());
    }

    #[tokio::test]
    async fn hung_upstream_times_out_as_bad_gateway() {
        let upstream = MockServer::start(|_| Canned::Hang).await;
        let relay = relay(Some(upstream.base.clone()), Duration::from_millis(200));

        let started = std::time::Instant::now();
        let reply = relay.respond(&get("/api/proxy?endpoint=/api/server/status")).await;
        assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn invalid_upstream_json_is_bad_gateway() {
        let upstream = MockServer::start(|_| json_reply(200, "<html>")).await;
        let relay = relay(Some(upstream.base.clone()), Duration::from_secs(2));
        let reply = relay.respond(&get("/api/proxy?endpoint=/api/server/status")).await;
        assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn other_paths_and_methods_are_refused() {
        let relay = relay(Some("http://unused".into()), Duration::from_secs(1));

        let reply = relay.respond(&get("/elsewhere?endpoint=/x")).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);

        let post = RequestHead {
            method: "POST".into(),
            target: "/api/proxy?endpoint=/x".into(),
        };
        assert_eq!(relay.respond(&post).await.status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn endpoint_cannot_leave_the_api_origin() {
        let other = MockServer::start(|_| json_reply(200, r#"{"secret":"internal"}"#)).await;
        let other_authority = other.base.trim_start_matches("http://").to_string();
        let relay = relay(Some("http://api.invalid:8080".into()), Duration::from_secs(1));

        let targets = [
            format!("/api/proxy?endpoint=%40{other_authority}%2Fadmin"),
            format!("/api/proxy?endpoint=@{other_authority}/admin"),
            "/api/proxy?endpoint=api%2Fserver%2Fstatus".to_string(),
        ];
        for target in &targets {
            let reply = relay.respond(&get(target)).await;
            assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{target}");
            assert_eq!(error_body(&reply)["error"], "Invalid endpoint parameter");
        }
        assert_eq!(other.hits(), 0);
    }

    #[test]
    fn upstream_url_keeps_base_path() {
        let url = upstream_url("http://10.0.0.5:8080/stats", "/api/server/status").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5:8080/stats/api/server/status");
        assert!(matches!(
            upstream_url("http://10.0.0.5:8080", ".evil.test/x"),
            Err(RelayError::InvalidEndpoint)
        ));
    }

    #[tokio::test]
    async fn silent_client_is_disconnected() {
        use tokio::io::AsyncReadExt;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(relay(None, Duration::from_millis(200)).run(listener));

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut buf = Vec::new();
        let read = tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut buf))
            .await
            .expect("relay kept a silent connection open");
        assert_eq!(read.unwrap(), 0);
    }

    #[tokio::test]
    async fn serves_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(relay(None, Duration::from_secs(1)).run(listener));

        let response = reqwest::get(format!("http://{addr}/api/proxy")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&response.bytes().await.unwrap()).unwrap();
        assert!(body["error"].is_string());
    }
}
