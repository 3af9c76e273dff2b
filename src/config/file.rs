//! Client configuration file.
//!
//! Every section is optional; omitted values fall back to defaults that
//! match the stock photobooth deployment.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid service base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
    #[error("invalid polling interval (must be greater than zero)")]
    InvalidPollInterval,
    #[error("invalid event channel capacity (must be greater than zero)")]
    InvalidEventCapacity,
    #[error("invalid request timeout (must be greater than zero)")]
    InvalidTimeout,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Where the camera service lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL the API routes are joined onto.
    pub base_url: String,
    /// Per-request timeout in milliseconds. Unset means no timeout.
    pub request_timeout_ms: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/".to_owned(),
            request_timeout_ms: None,
        }
    }
}

/// Periodic discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Start polling when the client starts.
    pub enabled: bool,
    /// Milliseconds between discovery requests.
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5000,
        }
    }
}

impl PollingConfig {
    /// The polling interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Notification channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Events buffered per subscriber before the slowest one lags.
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

/// Metrics exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 9091 }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        reqwest::Url::parse(&self.service.base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(format!("{}: {e}", self.service.base_url)))?;
        if self.service.request_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        if self.events.capacity == 0 {
            return Err(ConfigError::InvalidEventCapacity);
        }
        Ok(())
    }
}
