//! Failures crossing the remote boundary.

use thiserror::Error;

/// Errors returned by a [`CameraApi`](super::CameraApi) call.
///
/// Both kinds leave the caller's state untouched; the distinction only
/// matters for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The service was unreachable or its response could not be read,
    /// including a response without a success flag.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The service answered with `success: false`.
    #[error("{0}")]
    Application(String),
}

impl RemoteError {
    /// Returns true for [`RemoteError::Transport`].
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}
