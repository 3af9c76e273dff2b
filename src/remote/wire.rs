//! JSON reply envelopes.
//!
//! Every reply is an object with a `success` flag and, on failure, an
//! `error` (or `message`) string. The remaining fields depend on the
//! operation.

use super::RemoteError;
use crate::camera::{CameraDescriptor, SettingValue};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_REJECTION: &str = "request rejected by camera service";

/// Checks the success flag and decodes the reply body.
pub fn decode_reply<T: DeserializeOwned>(body: Value) -> Result<T, RemoteError> {
    let success = body
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| RemoteError::Transport("response is missing the success flag".into()))?;

    if !success {
        let message = body
            .get("error")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_REJECTION);
        return Err(RemoteError::Application(message.to_owned()));
    }

    serde_json::from_value(body)
        .map_err(|e| RemoteError::Transport(format!("malformed response: {e}")))
}

/// Reply to a discovery request.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryReply {
    /// Cameras currently reachable.
    #[serde(default)]
    pub cameras: Vec<CameraDescriptor>,
    /// Count reported by the service.
    #[serde(default)]
    pub count: Option<usize>,
}

/// Reply to a connect request.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectReply {
    /// Backend-issued session handle.
    pub session_id: String,
    /// Camera information as the backend saw it at connect time.
    #[serde(default)]
    pub camera_info: Value,
    /// Device metadata read from the camera.
    #[serde(default)]
    pub device_info: Value,
}

impl ConnectReply {
    /// The camera info as a descriptor, if it has the descriptor shape.
    pub fn camera(&self) -> Option<CameraDescriptor> {
        serde_json::from_value(self.camera_info.clone()).ok()
    }
}

/// Reply to a capture request.
#[derive(Debug, Clone)]
pub struct CaptureReply {
    /// Server-side capture time.
    pub timestamp: Option<DateTime<Utc>>,
    /// The full reply, passed through to listeners.
    pub payload: Value,
}

impl CaptureReply {
    /// Builds the reply from an already validated body.
    ///
    /// The timestamp is read as fractional seconds since the Unix epoch.
    pub fn from_body(payload: Value) -> Self {
        let timestamp = payload
            .get("timestamp")
            .and_then(Value::as_f64)
            .and_then(|secs| DateTime::from_timestamp_millis((secs * 1000.0) as i64));
        Self { timestamp, payload }
    }
}

/// Reply to a setting read.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingReply {
    /// Current value on the camera.
    #[serde(default)]
    pub value: SettingValue,
}

/// One session as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSessionStatus {
    /// Session handle.
    pub session_id: String,
    /// Camera model.
    pub camera_model: String,
    /// Camera vendor.
    pub vendor_name: String,
    /// Connect time, seconds since the Unix epoch.
    pub connected_at: f64,
    /// Seconds since connect.
    pub connection_duration: f64,
    /// Whether the backend still drives the camera.
    #[serde(default)]
    pub is_active: bool,
}

/// Reply to a status request.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusReply {
    /// Sessions open on the backend.
    #[serde(default)]
    pub active_sessions: Vec<ActiveSessionStatus>,
}
