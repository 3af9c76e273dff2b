//! Session management.
//!
//! [`CameraSessionManager`] is the entry point. It keeps the discovered
//! cameras and open sessions, publishes [`CameraEvent`]s and reports
//! failures to an [`ErrorSink`].

mod error;
mod events;
mod indicator;
mod manager;
mod polling;
mod store;

pub use error::{ErrorSink, LogErrorSink, ManagerError};
pub use events::CameraEvent;
pub use indicator::{CaptureGuard, CaptureIndicator};
pub use manager::{CameraSessionManager, ManagerStats, ManagerStatus};
pub use store::{Session, SessionStore};
