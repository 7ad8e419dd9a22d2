//! Command-line and environment configuration.
//!
//! Everything is parsed once in `main` into a [`Cli`] and then turned into
//! the plain [`FetchConfig`] / [`RelayConfig`] structs that the rest of the
//! program receives explicitly.  No other module reads the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::source::ResourceKind;

/// How long the primary API gets before we move on to the fallback host.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_millis(10_000);

#[derive(Debug, Parser)]
#[command(name = "pz-dashboard", version, about = "Live statistics dashboard for a game server")]
pub struct Cli {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(flatten)]
    pub logging: LogArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the terminal dashboard (default).
    Tui,
    /// Fetch one resource and print the result as JSON.
    Fetch {
        #[arg(value_enum)]
        resource: ResourceKind,
    },
    /// Serve the same-origin relay that forwards `?endpoint=` to the API.
    Relay {
        #[arg(long, env = "DASHBOARD_RELAY_BIND", default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Base address of the statistics API (e.g. `http://203.0.113.7:8080`).
    #[arg(long, global = true, env = "DASHBOARD_API_URL")]
    pub api_url: Option<String>,

    /// Relay endpoint to route API requests through instead of calling it directly.
    #[arg(long, global = true, env = "DASHBOARD_PROXY_URL")]
    pub proxy_url: Option<String>,

    /// Base address of the static snapshot host.
    #[arg(long, global = true, env = "DASHBOARD_DATA_REPO_URL")]
    pub fallback_url: Option<String>,

    /// Primary request timeout in milliseconds.
    #[arg(long, global = true, env = "DASHBOARD_TIMEOUT_MS", default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Optional timeout for the fallback request.  Unbounded when unset.
    #[arg(long, global = true, env = "DASHBOARD_FALLBACK_TIMEOUT_MS")]
    pub fallback_timeout_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, global = true, env = "DASHBOARD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log file for the terminal dashboard (other commands log to stderr).
    #[arg(long, global = true, env = "DASHBOARD_LOG_FILE", default_value = "pz-dashboard.log")]
    pub log_file: PathBuf,
}

/// Addresses and bounds used by [`crate::source::Fetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub api_url: Option<String>,
    pub proxy_url: Option<String>,
    pub fallback_url: Option<String>,
    pub api_timeout: Duration,
    pub fallback_timeout: Option<Duration>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            proxy_url: None,
            fallback_url: None,
            api_timeout: DEFAULT_API_TIMEOUT,
            fallback_timeout: None,
        }
    }
}

impl From<&SourceArgs> for FetchConfig {
    fn from(args: &SourceArgs) -> Self {
        Self {
            api_url: normalize_base(args.api_url.as_deref()),
            proxy_url: normalize_base(args.proxy_url.as_deref()),
            fallback_url: normalize_base(args.fallback_url.as_deref()),
            api_timeout: Duration::from_millis(args.timeout_ms),
            fallback_timeout: args.fallback_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Settings for the relay server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    pub api_url: Option<String>,
    pub timeout: Duration,
}

impl RelayConfig {
    pub fn new(bind: SocketAddr, sources: &SourceArgs) -> Self {
        Self {
            bind,
            api_url: normalize_base(sources.api_url.as_deref()),
            timeout: Duration::from_millis(sources.timeout_ms),
        }
    }
}

/// Empty values count as unset; trailing slashes are dropped so paths join cleanly.
fn normalize_base(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().trim_end_matches('/'))
        .filter(|v| !v.is_empty())
        .map(String::from)
}
