//! USB Camera Client Library
//!
//! Session management for a photobooth's USB cameras. The cameras are
//! driven by a backend service; this crate discovers them, opens and
//! closes sessions, triggers captures and reads or writes settings, and
//! tells UI listeners about every change.
//!
//! # Architecture
//!
//! ```text
//! CameraSessionManager ──► CameraApi ──► camera service (HTTP)
//!        │                     └──► MockCameraApi (in memory)
//!        ├──► CameraEvent broadcast (UI listeners)
//!        └──► ErrorSink (user-facing failures)
//! ```
//!
//! # Design Principles
//!
//! - **Explicit instance**: one manager per service, shared as an `Arc`
//! - **State after response**: nothing changes until the service answers
//! - **Every failure surfaces**: errors reach the sink and the caller
//! - **No hidden caching**: settings are always read from the service
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use usb_camera::{CameraSessionManager, CameraSetting, HttpCameraApi};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let api = HttpCameraApi::new("http://127.0.0.1:8000/", None)?;
//! let manager = Arc::new(CameraSessionManager::new(Arc::new(api)));
//!
//! let cameras = manager.try_detect().await?;
//! if let Some(camera) = cameras.first() {
//!     manager.connect(&camera.id, None).await?;
//!     manager
//!         .set_setting(CameraSetting::Iso, serde_json::json!(400), None)
//!         .await?;
//!     let photo = manager.capture(None).await?;
//!     println!("captured at {:?}", photo.timestamp);
//! }
//!
//! manager.teardown().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod camera;
pub mod config;
pub mod metrics;
pub mod remote;
pub mod session;

// Re-export commonly used types at crate root
pub use camera::{CameraDescriptor, CameraSetting, CameraType, ConnectionState, SettingValue};
pub use config::{ConfigError, FileConfig};
pub use remote::{CameraApi, HttpCameraApi, MockCameraApi, RemoteError};
pub use session::{CameraEvent, CameraSessionManager, ErrorSink, LogErrorSink, ManagerError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
