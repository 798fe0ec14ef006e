//! Operator configuration.
//!
//! Process-wide immutable values injected at startup: the poll interval,
//! the finalizer marker this controller owns, and an optional default
//! endpoint override. Loaded from the environment with fail-fast
//! validation; malformed values abort startup rather than silently
//! defaulting.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Finalizer marker recognized only by this controller. Other controllers
/// must not strip it.
pub const DEFAULT_FINALIZER: &str = "training-jobs.lodestar.dev/finalizer";

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_finalizer() -> String {
    DEFAULT_FINALIZER.to_string()
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held an unparseable value.
    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: &'static str, message: String },
}

/// Process-wide operator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Fixed retry cadence for transient failures and in-progress polls.
    /// Constant by design: the remote API's own transitions take minutes,
    /// so exponential backoff buys nothing.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Finalizer marker string.
    #[serde(default = "default_finalizer")]
    pub finalizer: String,

    /// Default remote endpoint override applied when an object does not
    /// carry its own.
    #[serde(default)]
    pub default_endpoint: Option<String>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            finalizer: default_finalizer(),
            default_endpoint: None,
        }
    }
}

impl OperatorConfig {
    /// The poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Load from environment variables: `LODESTAR_POLL_INTERVAL_SECS`,
    /// `LODESTAR_FINALIZER`, `LODESTAR_DEFAULT_ENDPOINT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("LODESTAR_POLL_INTERVAL_SECS") {
            config.poll_interval_secs =
                raw.parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                        var: "LODESTAR_POLL_INTERVAL_SECS",
                        message: e.to_string(),
                    })?;
        }
        if let Ok(raw) = std::env::var("LODESTAR_FINALIZER") {
            if raw.is_empty() {
                return Err(ConfigError::InvalidValue {
                    var: "LODESTAR_FINALIZER",
                    message: "must not be empty".to_string(),
                });
            }
            config.finalizer = raw;
        }
        if let Ok(raw) = std::env::var("LODESTAR_DEFAULT_ENDPOINT") {
            config.default_endpoint = Some(raw);
        }

        Ok(config)
    }
}
