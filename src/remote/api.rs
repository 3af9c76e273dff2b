//! The remote capability boundary.

use super::{ActiveSessionStatus, CaptureReply, ConnectReply, RemoteError};
use crate::camera::{CameraDescriptor, CameraSetting, SettingValue};
use async_trait::async_trait;
use std::fmt;

/// Operations offered by the camera service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Enumerate reachable cameras.
    Discover,
    /// Open a session.
    Connect,
    /// Close a session.
    Disconnect,
    /// Take a photo.
    Capture,
    /// Write a setting.
    SetSetting,
    /// Read a setting.
    GetSetting,
    /// List open sessions.
    Status,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Operation::Discover => "detecting cameras",
            Operation::Connect => "connecting camera",
            Operation::Disconnect => "disconnecting camera",
            Operation::Capture => "capturing photo",
            Operation::SetSetting => "configuring camera",
            Operation::GetSetting => "reading camera setting",
            Operation::Status => "reading camera status",
        };
        f.write_str(verb)
    }
}

/// Client side of the camera service.
///
/// Implementations perform one request per call and never retry. An
/// `Err` leaves the service in whatever state it reports; callers must
/// not assume the request had no effect on a transport failure.
#[async_trait]
pub trait CameraApi: Send + Sync {
    /// Lists cameras currently reachable by the service.
    async fn discover(&self) -> Result<Vec<CameraDescriptor>, RemoteError>;

    /// Opens a session on a camera, tagged with an optional event context.
    async fn connect(
        &self,
        camera_id: &str,
        event_context: Option<&str>,
    ) -> Result<ConnectReply, RemoteError>;

    /// Closes a session.
    async fn disconnect(&self, session_id: &str) -> Result<(), RemoteError>;

    /// Triggers a capture on the session's camera.
    async fn capture(&self, session_id: &str) -> Result<CaptureReply, RemoteError>;

    /// Writes a setting.
    async fn set_setting(
        &self,
        session_id: &str,
        setting: CameraSetting,
        value: &SettingValue,
    ) -> Result<(), RemoteError>;

    /// Reads a setting.
    async fn get_setting(
        &self,
        session_id: &str,
        setting: CameraSetting,
    ) -> Result<SettingValue, RemoteError>;

    /// Lists sessions open on the service.
    async fn status(&self) -> Result<Vec<ActiveSessionStatus>, RemoteError>;
}
