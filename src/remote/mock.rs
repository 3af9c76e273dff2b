//! In-memory camera service for tests and demos.

use super::{ActiveSessionStatus, CameraApi, CaptureReply, ConnectReply, Operation, RemoteError};
use crate::camera::{CameraDescriptor, CameraSetting, SettingValue};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

#[derive(Debug)]
struct MockSession {
    camera: CameraDescriptor,
    connected_at: f64,
}

#[derive(Debug, Default)]
struct MockState {
    cameras: Vec<CameraDescriptor>,
    sessions: HashMap<String, MockSession>,
    settings: HashMap<(String, CameraSetting), SettingValue>,
    failures: HashMap<Operation, VecDeque<RemoteError>>,
    calls: HashMap<Operation, usize>,
    next_session: u64,
}

/// Camera service simulated in memory.
///
/// Behaves like the photobooth backend: connect requires a discovered
/// camera, session-bound calls require an open session, and settings
/// echo back whatever was last written. Failures can be queued per
/// operation, and every call is counted.
#[derive(Debug, Default)]
pub struct MockCameraApi {
    state: Mutex<MockState>,
    latency: Option<Duration>,
}

impl MockCameraApi {
    /// Creates a service with no cameras attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service with the given cameras attached.
    pub fn with_cameras(cameras: Vec<CameraDescriptor>) -> Self {
        let api = Self::new();
        api.set_cameras(cameras);
        api
    }

    /// Creates a service with two demo cameras attached.
    pub fn demo() -> Self {
        Self::with_cameras(vec![
            CameraDescriptor::new("04a9:3218", "EOS 600D", "Canon").with_serial("0123456789"),
            CameraDescriptor::new("054c:0994", "ILCE-7M3", "Sony"),
        ])
    }

    /// Delays every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replaces the attached cameras.
    pub fn set_cameras(&self, cameras: Vec<CameraDescriptor>) {
        self.state.lock().cameras = cameras;
    }

    /// Makes the next call of `operation` fail with `error`.
    ///
    /// Queued failures are consumed in order, one per call.
    pub fn fail_next(&self, operation: Operation, error: RemoteError) {
        self.state
            .lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Number of calls made for `operation`, failed ones included.
    pub fn calls(&self, operation: Operation) -> usize {
        self.state.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Number of sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.state.lock().sessions.len()
    }

    async fn begin(&self, operation: Operation) -> Result<(), RemoteError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        *state.calls.entry(operation).or_default() += 1;
        match state.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn not_connected() -> RemoteError {
    RemoteError::Application("camera not connected".into())
}

fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[async_trait]
impl CameraApi for MockCameraApi {
    async fn discover(&self) -> Result<Vec<CameraDescriptor>, RemoteError> {
        self.begin(Operation::Discover).await?;
        Ok(self.state.lock().cameras.clone())
    }

    async fn connect(
        &self,
        camera_id: &str,
        _event_context: Option<&str>,
    ) -> Result<ConnectReply, RemoteError> {
        self.begin(Operation::Connect).await?;

        let mut state = self.state.lock();
        let camera = state
            .cameras
            .iter()
            .find(|camera| camera.id == camera_id)
            .cloned()
            .ok_or_else(|| RemoteError::Application("camera not found".into()))?;

        state.next_session += 1;
        let session_id = format!("s-{}", state.next_session);
        let camera_info = json!(camera);
        let device_info = json!({
            "manufacturer": camera.vendor_name,
            "model": camera.model,
            "serial_number": camera.serial_number,
        });
        state.sessions.insert(
            session_id.clone(),
            MockSession {
                camera,
                connected_at: now_secs(),
            },
        );

        Ok(ConnectReply {
            session_id,
            camera_info,
            device_info,
        })
    }

    async fn disconnect(&self, session_id: &str) -> Result<(), RemoteError> {
        self.begin(Operation::Disconnect).await?;

        let mut state = self.state.lock();
        if state.sessions.remove(session_id).is_none() {
            return Err(RemoteError::Application("error disconnecting camera".into()));
        }
        state.settings.retain(|(session, _), _| session != session_id);
        Ok(())
    }

    async fn capture(&self, session_id: &str) -> Result<CaptureReply, RemoteError> {
        self.begin(Operation::Capture).await?;

        let state = self.state.lock();
        if !state.sessions.contains_key(session_id) {
            return Err(not_connected());
        }
        Ok(CaptureReply::from_body(json!({
            "success": true,
            "message": "image captured",
            "timestamp": now_secs(),
        })))
    }

    async fn set_setting(
        &self,
        session_id: &str,
        setting: CameraSetting,
        value: &SettingValue,
    ) -> Result<(), RemoteError> {
        self.begin(Operation::SetSetting).await?;

        let mut state = self.state.lock();
        if !state.sessions.contains_key(session_id) {
            return Err(not_connected());
        }
        if !setting.is_writable() {
            return Err(RemoteError::Application(format!(
                "unsupported setting: {setting}"
            )));
        }
        state
            .settings
            .insert((session_id.to_owned(), setting), value.clone());
        Ok(())
    }

    async fn get_setting(
        &self,
        session_id: &str,
        setting: CameraSetting,
    ) -> Result<SettingValue, RemoteError> {
        self.begin(Operation::GetSetting).await?;

        let state = self.state.lock();
        if !state.sessions.contains_key(session_id) {
            return Err(not_connected());
        }
        if setting == CameraSetting::BatteryLevel {
            return Ok(json!(100));
        }
        state
            .settings
            .get(&(session_id.to_owned(), setting))
            .cloned()
            .ok_or_else(|| RemoteError::Application("error reading property".into()))
    }

    async fn status(&self) -> Result<Vec<ActiveSessionStatus>, RemoteError> {
        self.begin(Operation::Status).await?;

        let now = now_secs();
        let state = self.state.lock();
        let mut sessions: Vec<ActiveSessionStatus> = state
            .sessions
            .iter()
            .map(|(session_id, session)| ActiveSessionStatus {
                session_id: session_id.clone(),
                camera_model: session.camera.model.clone(),
                vendor_name: session.camera.vendor_name.clone(),
                connected_at: session.connected_at,
                connection_duration: now - session.connected_at,
                is_active: true,
            })
            .collect();
        sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Ok(sessions)
    }
}
