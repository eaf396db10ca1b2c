// src/logging.rs

//! Logging setup for `spoolq` using `tracing` + `tracing-subscriber`.
//!
//! The entry point owns a [`LogConfig`] and installs the subscriber once;
//! components only emit `tracing` events and never hold a logger.
//!
//! The level comes from the `SPOOLQ_LOG` environment variable
//! (e.g. "info", "debug") and defaults to `info`. Logs go to STDERR so stdout
//! stays free for the startup banner and shutdown summary.

use anyhow::{Result, anyhow};
use tracing_subscriber::fmt;

pub const LOG_ENV_VAR: &str = "SPOOLQ_LOG";

/// Process-wide logging configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: tracing::Level,
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            with_target: true,
        }
    }
}

impl LogConfig {
    /// Build a config from `SPOOLQ_LOG`, falling back to the defaults.
    pub fn from_env() -> Self {
        let level = std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO);

        Self {
            level,
            ..Self::default()
        }
    }

    /// Install the global subscriber. Call once at startup.
    pub fn init(&self) -> Result<()> {
        fmt()
            .with_max_level(self.level)
            .with_target(self.with_target)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow!("installing tracing subscriber: {e}"))
    }
}

pub fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
