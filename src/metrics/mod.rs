//! Prometheus metrics exporter for camera session monitoring.
//!
//! # Metrics Exposed
//!
//! ## State Gauges
//! - `usb_camera_available` - Cameras reported by the latest discovery
//! - `usb_camera_active_sessions` - Open camera sessions
//! - `usb_camera_polling` - Periodic discovery status (1=running, 0=stopped)
//! - `usb_camera_capture_in_progress` - Capture status (1=capturing, 0=idle)
//!
//! ## Operation Counters
//! - `usb_camera_detections_total` / `usb_camera_detection_failures_total`
//! - `usb_camera_connects_total` / `usb_camera_connect_failures_total`
//! - `usb_camera_disconnects_total` / `usb_camera_disconnect_failures_total`
//! - `usb_camera_captures_total` / `usb_camera_capture_failures_total`
//! - `usb_camera_setting_changes_total`
//!
//! With the `metrics` feature, [`MetricsServer`] serves `/metrics`,
//! `/health` and a JSON `/status` of the manager.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use usb_camera::metrics::{MetricsRegistry, MetricsSnapshot};
//! use usb_camera::remote::MockCameraApi;
//! use usb_camera::CameraSessionManager;
//!
//! let manager = CameraSessionManager::new(Arc::new(MockCameraApi::demo()));
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! registry.update(&MetricsSnapshot::from_manager(&manager));
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
