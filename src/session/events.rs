//! Notifications emitted by the session manager.
//!
//! Events fan out over a [`broadcast`] channel: any number of listeners
//! can subscribe, emitting never blocks, and an emit with no listeners is
//! dropped.

use crate::camera::{CameraDescriptor, CameraSetting, SettingValue};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// A notification for UI listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum CameraEvent {
    /// The number of discovered cameras changed.
    CamerasDetected {
        /// The new camera list.
        cameras: Vec<CameraDescriptor>,
        /// Length of `cameras`.
        count: usize,
    },
    /// A session was opened.
    CameraConnected {
        /// Camera the session belongs to.
        camera_id: String,
        /// New session handle.
        session_id: String,
        /// Camera descriptor at connect time.
        camera: CameraDescriptor,
    },
    /// A session was closed.
    CameraDisconnected {
        /// Closed session handle.
        session_id: String,
        /// Camera that held it, when known locally.
        camera_id: Option<String>,
    },
    /// A photo was taken.
    PhotoCaptured {
        /// Session that captured.
        session_id: String,
        /// Server-side capture time.
        timestamp: Option<DateTime<Utc>>,
        /// Full service reply.
        payload: Value,
    },
    /// A setting was written.
    SettingChanged {
        /// Session the setting was written on.
        session_id: String,
        /// Setting name.
        setting: CameraSetting,
        /// Value written.
        value: SettingValue,
    },
    /// The manager finished its start-up discovery and began polling.
    ControllerInitialized {
        /// Cameras found at start-up.
        cameras: Vec<CameraDescriptor>,
    },
    /// A connect attempt failed.
    ConnectionError {
        /// Camera that failed to connect.
        camera_id: String,
        /// User-facing message.
        message: String,
    },
}

impl CameraEvent {
    /// Event name as exposed to the UI.
    pub fn name(&self) -> &'static str {
        match self {
            CameraEvent::CamerasDetected { .. } => "cameras-detected",
            CameraEvent::CameraConnected { .. } => "camera-connected",
            CameraEvent::CameraDisconnected { .. } => "camera-disconnected",
            CameraEvent::PhotoCaptured { .. } => "photo-captured",
            CameraEvent::SettingChanged { .. } => "setting-changed",
            CameraEvent::ControllerInitialized { .. } => "controller-initialized",
            CameraEvent::ConnectionError { .. } => "connection-error",
        }
    }
}

/// Fan-out of [`CameraEvent`]s.
#[derive(Debug)]
pub(crate) struct EventBus {
    tx: broadcast::Sender<CameraEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CameraEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: CameraEvent) {
        let name = event.name();
        // No receivers is fine; events are fire-and-forget.
        let delivered = self.tx.send(event).unwrap_or(0);
        tracing::trace!(event = name, delivered, "event emitted");
    }
}
