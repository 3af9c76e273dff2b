//! Configuration loading and validation.

mod file;

pub use file::{ConfigError, EventsConfig, FileConfig, MetricsConfig, PollingConfig, ServiceConfig};
