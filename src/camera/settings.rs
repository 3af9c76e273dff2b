//! Camera settings understood by the backend.
//!
//! The backend maps each wire name to a PTP device property. Values are
//! passed through untouched; their encoding is camera-specific.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque setting value, forwarded as-is to and from the backend.
pub type SettingValue = serde_json::Value;

/// A camera setting addressable through the settings endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraSetting {
    /// Exposure index.
    Iso,
    /// F-number.
    Aperture,
    /// Exposure time.
    ShutterSpeed,
    /// White balance mode.
    WhiteBalance,
    /// Focus mode.
    FocusMode,
    /// Exposure program mode.
    ExposureMode,
    /// Battery level (read-only).
    BatteryLevel,
}

impl CameraSetting {
    /// Every setting, in wire-name order.
    pub const ALL: [CameraSetting; 7] = [
        CameraSetting::Iso,
        CameraSetting::Aperture,
        CameraSetting::ShutterSpeed,
        CameraSetting::WhiteBalance,
        CameraSetting::FocusMode,
        CameraSetting::ExposureMode,
        CameraSetting::BatteryLevel,
    ];

    /// Name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            CameraSetting::Iso => "iso",
            CameraSetting::Aperture => "aperture",
            CameraSetting::ShutterSpeed => "shutter_speed",
            CameraSetting::WhiteBalance => "white_balance",
            CameraSetting::FocusMode => "focus_mode",
            CameraSetting::ExposureMode => "exposure_mode",
            CameraSetting::BatteryLevel => "battery_level",
        }
    }

    /// Returns false for settings the backend only reports.
    pub fn is_writable(self) -> bool {
        !matches!(self, CameraSetting::BatteryLevel)
    }
}

impl fmt::Display for CameraSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown setting name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported camera setting: {0}")]
pub struct UnknownSetting(pub String);

impl FromStr for CameraSetting {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CameraSetting::ALL
            .into_iter()
            .find(|setting| setting.as_str() == s)
            .ok_or_else(|| UnknownSetting(s.to_owned()))
    }
}
