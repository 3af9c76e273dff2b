//! Camera descriptors as reported by discovery.

use serde::{Deserialize, Serialize};

/// A camera reported by the discovery endpoint.
///
/// Descriptors are immutable snapshots. Each discovery response replaces
/// the previous list wholesale; there is no incremental diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    /// Stable identifier (`vendor:product` on the photobooth backend).
    pub id: String,
    /// Display model name.
    pub model: String,
    /// Vendor name.
    pub vendor_name: String,
    /// Product name, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    /// Serial number, when the device exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Transport the device was found on (e.g. `usb`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    /// Whether the backend considers the device free to connect.
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

impl CameraDescriptor {
    /// Creates a descriptor with only the required fields.
    pub fn new(
        id: impl Into<String>,
        model: impl Into<String>,
        vendor_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            vendor_name: vendor_name.into(),
            product_name: None,
            serial_number: None,
            connection_type: None,
            is_available: true,
        }
    }

    /// Sets the serial number.
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    /// Placeholder used when a connect reply carries no camera info and
    /// the camera was never seen by discovery.
    pub(crate) fn unknown(id: &str) -> Self {
        Self::new(id, id, "unknown")
    }

    /// Label shown in camera pickers: the model, followed by the serial
    /// number in parentheses when present.
    pub fn display_label(&self) -> String {
        match &self.serial_number {
            Some(serial) => format!("{} ({})", self.model, serial),
            None => self.model.clone(),
        }
    }
}
