//! Configuration management for the booking application.
//!
//! Loads configuration from environment variables with sensible defaults.
//! A `.env` file in the working directory is read first when present.

use serde::{Deserialize, Serialize};
use slotbook_core::group::RosterError;
use slotbook_core::slot::DEFAULT_SLOT_CAPACITY;
use slotbook_runtime::ConfirmSource;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration or the roster.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The roster file could not be read.
    #[error("Failed to read roster file {path}: {source}")]
    ReadRoster {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The roster file is not a valid JSON roster.
    #[error("Failed to parse roster file {path}: {source}")]
    ParseRoster {
        /// File that was requested
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// The built-in roster is invalid.
    #[error("Invalid roster: {0}")]
    Roster(#[from] RosterError),

    /// Metrics host and port do not form a socket address.
    #[error("Invalid metrics address: {0}")]
    MetricsAddr(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Booking behaviour
    pub booking: BookingConfig,
    /// Prometheus metrics
    pub metrics: MetricsConfig,
}

/// Booking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Concurrent occupants per slot (`SLOT_CAPACITY`, default 2)
    pub slot_capacity: u32,
    /// Confirm snapshot source (`CONFIRM_SOURCE`: `local` or `store`)
    pub confirm_source: ConfirmSource,
    /// JSON roster to use instead of the built-in one (`ROSTER_PATH`)
    pub roster_path: Option<PathBuf>,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder (`METRICS_ENABLED`, default true)
    pub enabled: bool,
    /// Metrics host (`METRICS_HOST`)
    pub host: String,
    /// Metrics port (`METRICS_PORT`)
    pub port: u16,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Reads `.env` first if one exists. Unset or unparsable variables fall
    /// back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            booking: BookingConfig {
                slot_capacity: lookup("SLOT_CAPACITY")
                    .and_then(|s| s.parse().ok())
                    .filter(|&capacity| capacity > 0)
                    .unwrap_or(DEFAULT_SLOT_CAPACITY),
                confirm_source: lookup("CONFIRM_SOURCE")
                    .as_deref()
                    .and_then(parse_confirm_source)
                    .unwrap_or_default(),
                roster_path: lookup("ROSTER_PATH")
                    .filter(|path| !path.is_empty())
                    .map(PathBuf::from),
            },
            metrics: MetricsConfig {
                enabled: lookup("METRICS_ENABLED")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
                host: lookup("METRICS_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: lookup("METRICS_PORT")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(9090),
            },
        }
    }

    /// The metrics socket address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MetricsAddr`] if host and port do not parse.
    pub fn metrics_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.metrics.host, self.metrics.port);
        addr.parse().map_err(|_| ConfigError::MetricsAddr(addr))
    }
}

fn parse_confirm_source(value: &str) -> Option<ConfirmSource> {
    match value.trim().to_ascii_lowercase().as_str() {
        "local" => Some(ConfirmSource::LocalSnapshot),
        "store" => Some(ConfirmSource::StoreRead),
        other => {
            tracing::warn!(value = other, "Unknown CONFIRM_SOURCE, using local");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Panics: tests fail loudly on bad fixtures
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config(&[]);

        assert_eq!(config.booking.slot_capacity, 2);
        assert_eq!(config.booking.confirm_source, ConfirmSource::LocalSnapshot);
        assert!(config.booking.roster_path.is_none());
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics_addr().unwrap(), "0.0.0.0:9090".parse().unwrap());
    }

    #[test]
    fn reads_every_variable() {
        let config = config(&[
            ("SLOT_CAPACITY", "3"),
            ("CONFIRM_SOURCE", "Store"),
            ("ROSTER_PATH", "/etc/slotbook/roster.json"),
            ("METRICS_ENABLED", "false"),
            ("METRICS_HOST", "127.0.0.1"),
            ("METRICS_PORT", "9191"),
        ]);

        assert_eq!(config.booking.slot_capacity, 3);
        assert_eq!(config.booking.confirm_source, ConfirmSource::StoreRead);
        assert_eq!(
            config.booking.roster_path,
            Some(PathBuf::from("/etc/slotbook/roster.json"))
        );
        assert!(!config.metrics.enabled);
        assert_eq!(config.metrics_addr().unwrap(), "127.0.0.1:9191".parse().unwrap());
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = config(&[
            ("SLOT_CAPACITY", "0"),
            ("CONFIRM_SOURCE", "eventually"),
            ("ROSTER_PATH", ""),
            ("METRICS_PORT", "not-a-port"),
        ]);

        assert_eq!(config.booking.slot_capacity, 2);
        assert_eq!(config.booking.confirm_source, ConfirmSource::LocalSnapshot);
        assert!(config.booking.roster_path.is_none());
        assert_eq!(config.metrics.port, 9090);
    }

    #[test]
    fn bad_metrics_host_is_an_error() {
        let config = config(&[("METRICS_HOST", "not a host")]);
        assert!(matches!(config.metrics_addr(), Err(ConfigError::MetricsAddr(_))));
    }
}
