//! Fetch with timeout and fallback.
//!
//! [`Fetcher::fetch`] tries the primary API once, bounded by the configured
//! timeout, then the fallback snapshot host once, and otherwise reports an
//! error result.  It never returns `Err` and never panics: every failure
//! becomes a [`FetchResult`] so callers only branch on the source tag.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use super::result::FetchResult;
use crate::config::FetchConfig;

/// Error message carried by a result when neither source produced data.
pub const BOTH_SOURCES_FAILED: &str = "Failed to fetch data from both API and fallback";

/// Why a single attempt failed.  Only ever logged; callers see [`FetchResult`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("no complete response within {0:?}")]
    Timeout(Duration),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {0}")]
    Status(StatusCode),
    #[error("payload did not decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url {0}")]
    InvalidUrl(String),
}

/// Resolves logical resources against the primary API and the fallback host.
///
/// Cheap to clone: the underlying [`Client`] shares its connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            config,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch `endpoint` from the primary source, or `fallback_file` from the
    /// fallback host if that fails.
    ///
    /// The body must decode as `T`; a body that does not is treated like any
    /// other failure of that step.  Use `serde_json::Value` for an untyped
    /// fetch.
    pub async fn fetch<T>(&self, endpoint: &str, fallback_file: &str) -> FetchResult<T>
    where
        T: DeserializeOwned,
    {
        match self.primary_url(endpoint) {
            Ok(Some(url)) => {
                let attempt = bounded(Some(self.config.api_timeout), self.get_json(&url));
                match attempt.await {
                    Ok(data) => return FetchResult::api(data),
                    Err(e) => warn!(
                        endpoint,
                        error = %e,
                        "API fetch failed, falling back to static data"
                    ),
                }
            }
            Ok(None) => debug!(endpoint, "no API configured, skipping primary source"),
            Err(e) => warn!(endpoint, error = %e, "cannot build API request"),
        }

        if let Some(base) = &self.config.fallback_url {
            let url = format!("{base}/{fallback_file}");
            match bounded(self.config.fallback_timeout, self.get_json(&url)).await {
                Ok(data) => return FetchResult::fallback(data),
                Err(e) => error!(fallback_file, error = %e, "fallback fetch failed"),
            }
        } else {
            debug!(fallback_file, "no fallback host configured");
        }

        FetchResult::failed(BOTH_SOURCES_FAILED)
    }

    /// Where the primary attempt goes: through the relay when one is
    /// configured, straight to the API otherwise, nowhere if neither is set.
    fn primary_url(&self, endpoint: &str) -> Result<Option<String>, FetchError> {
        if let Some(proxy) = &self.config.proxy_url {
            let mut url =
                Url::parse(proxy).map_err(|e| FetchError::InvalidUrl(format!("{proxy}: {e}")))?;
            url.query_pairs_mut().append_pair("endpoint", endpoint);
            return Ok(Some(url.into()));
        }
        Ok(self
            .config
            .api_url
            .as_ref()
            .map(|base| format!("{base}{endpoint}")))
    }

    async fn get_json<T>(&self, url: &str) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Run `attempt` under `limit`, dropping (and so aborting) it on expiry.
async fn bounded<T, F>(limit: Option<Duration>, attempt: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, attempt)
            .await
            .map_err(|_| FetchError::Timeout(limit))?,
        None => attempt.await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use serde::Deserialize;
    use serde_json::{json, Value};

    use super::*;
    use crate::source::Source;
    use crate::testing::{json_reply, unreachable_base, Canned, MockServer};

    fn fetcher(api: Option<&MockServer>, fallback: Option<&MockServer>, timeout: Duration) -> Fetcher {
        Fetcher::new(FetchConfig {
            api_url: api.map(|s| s.base.clone()),
            fallback_url: fallback.map(|s| s.base.clone()),
            api_timeout: timeout,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn primary_success_never_touches_fallback() {
        let api = MockServer::start(|_| json_reply(200, r#"{"online": true, "current_players": 5}"#)).await;
        let fallback = MockServer::start(|_| json_reply(200, r#"{"stale": true}"#)).await;
        let fetcher = fetcher(Some(&api), Some(&fallback), Duration::from_secs(2));

        let result: FetchResult<Value> = fetcher.fetch("/api/server/status", "server_status.json").await;

        assert_eq!(result, FetchResult::api(json!({ "online": true, "current_players": 5 })));
        assert_eq!(api.requested(), vec!["/api/server/status".to_string()]);
        assert_eq!(fallback.hits(), 0);
    }

    #[tokio::test]
    async fn hung_primary_times_out_then_uses_fallback() {
        let api = MockServer::start(|_| Canned::Hang).await;
        let fallback = MockServer::start(|path| match path {
            "/online_players.json" => json_reply(200, r#"{"players": []}"#),
            _ => json_reply(404, "{}"),
        })
        .await;
        let timeout = Duration::from_millis(300);
        let fetcher = fetcher(Some(&api), Some(&fallback), timeout);

        let started = Instant::now();
        let result: FetchResult<Value> = fetcher.fetch("/api/players/online", "online_players.json").await;
        let elapsed = started.elapsed();

        assert_eq!(result, FetchResult::fallback(json!({ "players": [] })));
        assert!(elapsed >= timeout, "fell through after {elapsed:?}");
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
        assert_eq!(fallback.requested(), vec!["/online_players.json".to_string()]);
    }

    #[tokio::test]
    async fn error_status_without_fallback_is_terminal_failure() {
        let api = MockServer::start(|_| json_reply(503, r#"{"error":"down"}"#)).await;
        let fetcher = fetcher(Some(&api), None, Duration::from_secs(2));

        let result: FetchResult<Value> = fetcher.fetch("/api/server/status", "server_status.json").await;

        assert_eq!(result.source(), Source::Error);
        assert!(result.data().is_none());
        assert_eq!(result.error(), Some(BOTH_SOURCES_FAILED));
        assert_eq!(api.hits(), 1, "primary is not retried");
    }

    #[tokio::test]
    async fn both_sources_failing_is_terminal_failure() {
        let fallback = MockServer::start(|_| json_reply(404, "{}")).await;
        let fetcher = Fetcher::new(FetchConfig {
            api_url: Some(unreachable_base().await),
            fallback_url: Some(fallback.base.clone()),
            ..FetchConfig::default()
        })
        .unwrap();

        let result: FetchResult<Value> = fetcher.fetch("/api/activity/recent", "recent_activity.json").await;

        assert_eq!(result, FetchResult::failed(BOTH_SOURCES_FAILED));
        assert_eq!(fallback.hits(), 1);
    }

    #[tokio::test]
    async fn invalid_json_from_primary_falls_through() {
        let api = MockServer::start(|_| json_reply(200, "not json")).await;
        let fallback = MockServer::start(|_| json_reply(200, r#"{"from":"snapshot"}"#)).await;
        let fetcher = fetcher(Some(&api), Some(&fallback), Duration::from_secs(2));

        let result: FetchResult<Value> = fetcher.fetch("/api/players/stats", "player_stats.json").await;
        assert_eq!(result, FetchResult::fallback(json!({ "from": "snapshot" })));
    }

    #[tokio::test]
    async fn empty_primary_body_falls_through() {
        let api = MockServer::start(|_| json_reply(200, "")).await;
        let fallback = MockServer::start(|_| json_reply(200, "[]")).await;
        let fetcher = fetcher(Some(&api), Some(&fallback), Duration::from_secs(2));

        let result: FetchResult<Value> = fetcher.fetch("/api/players/stats", "player_stats.json").await;
        assert_eq!(result.source(), Source::Fallback);
    }

    #[tokio::test]
    async fn null_primary_body_is_still_api_for_untyped_fetch() {
        let api = MockServer::start(|_| json_reply(200, "null")).await;
        let fetcher = fetcher(Some(&api), None, Duration::from_secs(2));

        let result: FetchResult<Value> = fetcher.fetch("/api/server/status", "server_status.json").await;
        assert_eq!(result, FetchResult::api(Value::Null));
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Strict {
        required: u32,
    }

    #[tokio::test]
    async fn typed_decode_failure_falls_through() {
        let api = MockServer::start(|_| json_reply(200, r#"{"something_else": 1}"#)).await;
        let fallback = MockServer::start(|_| json_reply(200, r#"{"required": 7}"#)).await;
        let fetcher = fetcher(Some(&api), Some(&fallback), Duration::from_secs(2));

        let result: FetchResult<Strict> = fetcher.fetch("/x", "x.json").await;
        assert_eq!(result, FetchResult::fallback(Strict { required: 7 }));
    }

    #[tokio::test]
    async fn no_primary_configured_goes_straight_to_fallback() {
        let fallback = MockServer::start(|_| json_reply(200, r#"{"ok":1}"#)).await;
        let fetcher = fetcher(None, Some(&fallback), Duration::from_secs(2));

        let result: FetchResult<Value> = fetcher.fetch("/x", "x.json").await;
        assert_eq!(result.source(), Source::Fallback);
    }

    #[tokio::test]
    async fn fallback_timeout_bounds_a_hung_fallback_when_configured() {
        let fallback = MockServer::start(|_| Canned::Hang).await;
        let fetcher = Fetcher::new(FetchConfig {
            fallback_url: Some(fallback.base.clone()),
            fallback_timeout: Some(Duration::from_millis(200)),
            ..FetchConfig::default()
        })
        .unwrap();

        let result: FetchResult<Value> = fetcher.fetch("/x", "x.json").await;
        assert_eq!(result.source(), Source::Error);
    }

    #[tokio::test]
    async fn proxied_primary_sends_endpoint_as_query_parameter() {
        let relay = MockServer::start(|_| json_reply(200, r#"{"via":"relay"}"#)).await;
        let fetcher = Fetcher::new(FetchConfig {
            proxy_url: Some(format!("{}/api/proxy", relay.base)),
            api_url: Some(unreachable_base().await),
            ..FetchConfig::default()
        })
        .unwrap();

        let result: FetchResult<Value> = fetcher.fetch("/api/server/status", "server_status.json").await;

        assert_eq!(result, FetchResult::api(json!({ "via": "relay" })));
        assert_eq!(
            relay.requested(),
            vec!["/api/proxy?endpoint=%2Fapi%2Fserver%2Fstatus".to_string()]
        );
    }

    #[tokio::test]
    async fn repeated_calls_are_independent_and_identical() {
        let api = MockServer::start(|_| json_reply(200, r#"{"n": 1}"#)).await;
        let fetcher = fetcher(Some(&api), None, Duration::from_secs(2));

        let first: FetchResult<Value> = fetcher.fetch("/n", "n.json").await;
        let second: FetchResult<Value> = fetcher.fetch("/n", "n.json").await;

        assert_eq!(first, second);
        assert_eq!(api.hits(), 2, "no caching between calls");
    }
}
