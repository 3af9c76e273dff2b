//! Manager errors and the sink they are reported to.

use crate::camera::CameraSetting;
use crate::remote::{Operation, RemoteError};
use thiserror::Error;

/// Why a manager operation failed.
///
/// The `Display` text is meant for end users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    #[error("no camera connected")]
    NoActiveSession,
    #[error("camera id is required")]
    EmptyCameraId,
    #[error("camera {camera_id} is already connecting")]
    ConnectInFlight { camera_id: String },
    #[error("camera {camera_id} is already connected (session {session_id})")]
    AlreadyConnected {
        camera_id: String,
        session_id: String,
    },
    #[error("session {session_id} is not open")]
    UnknownSession { session_id: String },
    #[error("setting {0} is read-only")]
    ReadOnlySetting(CameraSetting),
    #[error("error {operation}: {source}")]
    Remote {
        operation: Operation,
        #[source]
        source: RemoteError,
    },
}

impl ManagerError {
    pub(crate) fn remote(operation: Operation, source: RemoteError) -> Self {
        ManagerError::Remote { operation, source }
    }

    /// The remote failure behind this error, if any.
    pub fn remote_error(&self) -> Option<&RemoteError> {
        match self {
            ManagerError::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Receives every failure the manager reports.
///
/// Reporting happens before the failing operation returns, so a sink sees
/// errors even when the caller discards the `Result`.
pub trait ErrorSink: Send + Sync {
    /// Handles one failure.
    fn report(&self, error: &ManagerError);
}

/// Sink that writes failures to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, error: &ManagerError) {
        match error.remote_error() {
            Some(remote) if remote.is_transport() => {
                tracing::error!(error = %error, "camera service unreachable");
            }
            _ => tracing::error!(error = %error, "camera operation failed"),
        }
    }
}
