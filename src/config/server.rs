//! # Probe Server Settings
//!
//! Port and startup behaviour of the metrics/probe endpoint, read from `METRICS_PORT`,
//! `SERVER_STARTUP_TIMEOUT_SECS` and `SERVER_POLL_INTERVAL_MS`.

use crate::constants::{
    DEFAULT_METRICS_PORT, DEFAULT_SERVER_POLL_INTERVAL_MS, DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
};

/// Settings for the `/metrics`, `/healthz` and `/readyz` listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// HTTP server port for metrics and health probes (`0` disables the server)
    pub metrics_port: u16,
    /// Seconds to wait for the listener to come up before startup fails
    pub startup_timeout_secs: u64,
    /// Milliseconds between listener readiness checks
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
        }
    }
}

impl ServerConfig {
    /// Read overrides from the environment, falling back to the defaults
    pub fn from_env() -> Self {
        Self {
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            startup_timeout_secs: env_var_or_default(
                "SERVER_STARTUP_TIMEOUT_SECS",
                DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            ),
            poll_interval_ms: env_var_or_default(
                "SERVER_POLL_INTERVAL_MS",
                DEFAULT_SERVER_POLL_INTERVAL_MS,
            ),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.metrics_port != 0
    }
}

/// Parsed value of `key`, or `default` when unset or unparseable
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
