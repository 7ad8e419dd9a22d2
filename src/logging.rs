//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins over `--log-level` when set.  The terminal dashboard owns
//! stdout, so in that mode records go to a file instead of stderr.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogArgs;

/// Where log records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Append to `--log-file`.
    File,
    Stderr,
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber.  Call once, before anything logs.
pub fn setup_logging(args: &LogArgs, target: LogTarget) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter(&args.log_level));

    match target {
        LogTarget::File => {
            let file = open_log_file(&args.log_file)?;
            registry
                .with(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(true)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()?;
        }
        LogTarget::Stderr => {
            registry
                .with(
                    fmt::layer()
                        .with_ansi(true)
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    info!(level = %args.log_level, ?target, "logging initialized");
    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}
