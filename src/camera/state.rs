//! Per-camera connection state and camera type selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Connection lifecycle of a single camera id, as seen by the manager.
///
/// ```text
/// Unknown → Available → Connecting → Connected → Disconnecting → Available
///                           ↓                         ↓
///                         Error ←─────────────────────┘
/// ```
///
/// `Error` is left by a fresh connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Never reported by discovery, or vanished without a session.
    Unknown,
    /// Reported by the latest discovery and not connected.
    Available,
    /// Connect request pending.
    Connecting,
    /// Holds a session.
    Connected,
    /// Disconnect request pending.
    Disconnecting,
    /// The last connect or disconnect request failed.
    Error,
}

impl ConnectionState {
    /// True while a request that changes the connection is outstanding.
    pub fn is_pending(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Disconnecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Unknown => "unknown",
            ConnectionState::Available => "available",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Error => "error",
        };
        f.write_str(label)
    }
}

/// Camera type selected in the photobooth configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraType {
    /// Browser webcam.
    Webcam,
    /// Generic PTP camera over USB.
    UsbPtp,
    /// Canon DSLR over USB.
    CanonDslr,
    /// Sony camera over USB.
    SonyCamera,
    /// Nikon DSLR driven by a separate dashboard.
    NikonDslr,
    /// Camera exposed through the Windows imaging stack.
    WindowsCamera,
}

impl CameraType {
    /// Whether this type is driven through USB sessions.
    pub fn uses_usb_session(self) -> bool {
        matches!(
            self,
            CameraType::UsbPtp | CameraType::CanonDslr | CameraType::SonyCamera
        )
    }
}

impl FromStr for CameraType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "webcam" => Ok(CameraType::Webcam),
            "usb_ptp" => Ok(CameraType::UsbPtp),
            "canon_dslr" => Ok(CameraType::CanonDslr),
            "sony_camera" => Ok(CameraType::SonyCamera),
            "nikon_dslr" => Ok(CameraType::NikonDslr),
            "windows_camera" => Ok(CameraType::WindowsCamera),
            other => Err(format!("unknown camera type: {other}")),
        }
    }
}
