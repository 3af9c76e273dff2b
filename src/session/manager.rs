//! Camera session manager.
//!
//! Owns the discovered camera list, the open sessions and the current
//! session pointer, and drives them through a [`CameraApi`].
//!
//! # Concurrency
//!
//! Calls are cooperative: each remote request suspends the caller and
//! state is mutated only once the response is in, under a lock that is
//! never held across an `.await`. A poll-driven [`detect`] may interleave
//! with user calls; they touch disjoint state. Requests are not
//! cancellable, and a disconnect racing a capture on the same session
//! applies whichever response arrives.
//!
//! [`detect`]: CameraSessionManager::detect

use super::error::{ErrorSink, LogErrorSink, ManagerError};
use super::events::{CameraEvent, EventBus};
use super::indicator::CaptureIndicator;
use super::polling::Poller;
use super::store::{Session, SessionStore};
use crate::camera::{CameraDescriptor, CameraSetting, CameraType, ConnectionState, SettingValue};
use crate::remote::{ActiveSessionStatus, CameraApi, CaptureReply, Operation};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Operation counters, for metrics and status pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManagerStats {
    /// Successful discovery requests.
    pub detections: u64,
    /// Failed discovery requests.
    pub detection_failures: u64,
    /// Sessions opened.
    pub connects: u64,
    /// Failed connect attempts, rejected ones included.
    pub connect_failures: u64,
    /// Sessions closed.
    pub disconnects: u64,
    /// Failed disconnect requests.
    pub disconnect_failures: u64,
    /// Photos taken.
    pub captures: u64,
    /// Failed capture attempts.
    pub capture_failures: u64,
    /// Settings written.
    pub setting_changes: u64,
}

/// Point-in-time view of the manager.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerStatus {
    /// Cameras from the latest successful discovery.
    pub available_cameras: Vec<CameraDescriptor>,
    /// Open sessions, ordered by connect time.
    pub sessions: Vec<Session>,
    /// Session targeted when none is given.
    pub current_session_id: Option<String>,
    /// Whether periodic discovery runs.
    pub polling: bool,
    /// Whether a capture is outstanding.
    pub capturing: bool,
    /// Operation counters.
    pub stats: ManagerStats,
}

#[derive(Debug, Default)]
struct ManagerState {
    available: Vec<CameraDescriptor>,
    sessions: SessionStore,
    current_session_id: Option<String>,
    connection: HashMap<String, ConnectionState>,
    connecting: HashSet<String>,
    stats: ManagerStats,
}

impl ManagerState {
    fn is_available(&self, camera_id: &str) -> bool {
        self.available.iter().any(|camera| camera.id == camera_id)
    }

    /// Re-derives connection states after a discovery.
    ///
    /// Newly seen cameras become Available; cameras that vanished and hold
    /// no session fall back to Unknown.
    fn refresh_connection_states(&mut self) {
        for camera in &self.available {
            self.connection
                .entry(camera.id.clone())
                .or_insert(ConnectionState::Available);
        }

        let available: HashSet<&str> = self.available.iter().map(|c| c.id.as_str()).collect();
        let sessions = &self.sessions;
        self.connection.retain(|camera_id, state| {
            available.contains(camera_id.as_str())
                || state.is_pending()
                || sessions.get(camera_id).is_some()
        });
    }

    /// State for a camera that no longer holds a session.
    fn settle(&mut self, camera_id: &str) {
        if self.is_available(camera_id) {
            self.connection
                .insert(camera_id.to_owned(), ConnectionState::Available);
        } else {
            self.connection.remove(camera_id);
        }
    }
}

/// Clears a camera's in-flight connect marker when dropped.
struct ConnectGuard<'a> {
    state: &'a Mutex<ManagerState>,
    camera_id: String,
}

impl Drop for ConnectGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().connecting.remove(&self.camera_id);
    }
}

/// Tracks cameras and sessions of a remote camera service.
///
/// Construct one per service and share it as `Arc<CameraSessionManager>`.
/// Every failure is handed to the [`ErrorSink`] before the operation
/// returns it, and leaves the manager as it was before the call.
pub struct CameraSessionManager {
    api: Arc<dyn CameraApi>,
    sink: Arc<dyn ErrorSink>,
    state: Mutex<ManagerState>,
    events: EventBus,
    indicator: CaptureIndicator,
    poller: Poller,
}

impl CameraSessionManager {
    /// Creates a manager that logs failures.
    pub fn new(api: Arc<dyn CameraApi>) -> Self {
        Self {
            api,
            sink: Arc::new(LogErrorSink),
            state: Mutex::new(ManagerState::default()),
            events: EventBus::new(DEFAULT_EVENT_CAPACITY),
            indicator: CaptureIndicator::new(),
            poller: Poller::default(),
        }
    }

    /// Reports failures to `sink` instead of the log.
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets how many events each subscriber may lag behind.
    ///
    /// Subscriptions taken before this call are not carried over.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.events = EventBus::new(capacity);
        self
    }

    fn fail(&self, error: ManagerError) -> ManagerError {
        self.sink.report(&error);
        error
    }

    fn resolve_session(&self, session_id: Option<&str>) -> Option<String> {
        session_id
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
            .or_else(|| self.state.lock().current_session_id.clone())
    }

    // ---- discovery -------------------------------------------------------

    /// Replaces the camera list with a fresh discovery.
    ///
    /// Fires `cameras-detected` once when the camera count changed. On
    /// failure the previous list is kept and the error is returned.
    pub async fn try_detect(&self) -> Result<Vec<CameraDescriptor>, ManagerError> {
        let cameras = match self.api.discover().await {
            Ok(cameras) => cameras,
            Err(source) => {
                self.state.lock().stats.detection_failures += 1;
                return Err(self.fail(ManagerError::remote(Operation::Discover, source)));
            }
        };

        let previous = {
            let mut state = self.state.lock();
            let previous = state.available.len();
            state.available = cameras.clone();
            state.refresh_connection_states();
            state.stats.detections += 1;
            previous
        };

        debug!(count = cameras.len(), "cameras detected");
        if previous != cameras.len() {
            info!(previous, count = cameras.len(), "camera list changed");
            self.events.emit(CameraEvent::CamerasDetected {
                count: cameras.len(),
                cameras: cameras.clone(),
            });
        }

        Ok(cameras)
    }

    /// Like [`try_detect`](Self::try_detect), but yields an empty list on
    /// failure. Use `try_detect` to tell "no cameras" from "discovery failed".
    pub async fn detect(&self) -> Vec<CameraDescriptor> {
        self.try_detect().await.unwrap_or_default()
    }

    // ---- connection ------------------------------------------------------

    /// Marks a connect as in flight. Also returns the stale session a
    /// camera in [`ConnectionState::Error`] still holds.
    fn begin_connect(
        &self,
        camera_id: &str,
    ) -> Result<(ConnectGuard<'_>, Option<String>), ManagerError> {
        let (rejection, stale_session) = {
            let mut state = self.state.lock();
            let stale = state.connection.get(camera_id) == Some(&ConnectionState::Error);
            let existing = state
                .sessions
                .get(camera_id)
                .map(|session| session.session_id.clone());

            let rejection = if state.connecting.contains(camera_id) {
                Some(ManagerError::ConnectInFlight {
                    camera_id: camera_id.to_owned(),
                })
            } else if let Some(session_id) = existing.clone().filter(|_| !stale) {
                Some(ManagerError::AlreadyConnected {
                    camera_id: camera_id.to_owned(),
                    session_id,
                })
            } else {
                state.connecting.insert(camera_id.to_owned());
                state
                    .connection
                    .insert(camera_id.to_owned(), ConnectionState::Connecting);
                None
            };
            (rejection, existing.filter(|_| stale))
        };

        match rejection {
            Some(error) => {
                self.state.lock().stats.connect_failures += 1;
                Err(self.fail(error))
            }
            None => Ok((
                ConnectGuard {
                    state: &self.state,
                    camera_id: camera_id.to_owned(),
                },
                stale_session,
            )),
        }
    }

    /// Closes the session a camera kept after a failed disconnect.
    ///
    /// On failure the session stays stored and the camera returns to
    /// [`ConnectionState::Error`], so teardown can still reach it.
    async fn close_stale_session(
        &self,
        camera_id: &str,
        session_id: &str,
    ) -> Result<(), ManagerError> {
        info!(camera_id, session_id, "closing stale session before reconnect");

        if let Err(source) = self.api.disconnect(session_id).await {
            {
                let mut state = self.state.lock();
                state
                    .connection
                    .insert(camera_id.to_owned(), ConnectionState::Error);
                state.stats.disconnect_failures += 1;
                state.stats.connect_failures += 1;
            }
            return Err(self.fail(ManagerError::remote(Operation::Disconnect, source)));
        }

        {
            let mut state = self.state.lock();
            state.sessions.remove_by_session(session_id);
            if state.current_session_id.as_deref() == Some(session_id) {
                state.current_session_id = None;
            }
            state.stats.disconnects += 1;
        }
        self.events.emit(CameraEvent::CameraDisconnected {
            session_id: session_id.to_owned(),
            camera_id: Some(camera_id.to_owned()),
        });
        Ok(())
    }

    /// Opens a session on `camera_id` and makes it current.
    ///
    /// `event_context` tags the session with the photobooth event it
    /// serves. A second connect for a camera that is connecting or
    /// connected is rejected without a request. A camera in
    /// [`ConnectionState::Error`] may be reconnected once its stale session
    /// is closed; if closing it fails, the reconnect fails too.
    pub async fn connect(
        &self,
        camera_id: &str,
        event_context: Option<&str>,
    ) -> Result<Session, ManagerError> {
        if camera_id.trim().is_empty() {
            return Err(self.fail(ManagerError::EmptyCameraId));
        }

        let (_in_flight, stale_session) = self.begin_connect(camera_id)?;
        if let Some(stale) = stale_session {
            self.close_stale_session(camera_id, &stale).await?;
        }
        info!(camera_id, event_context, "connecting camera");

        let reply = match self.api.connect(camera_id, event_context).await {
            Ok(reply) => reply,
            Err(source) => {
                {
                    let mut state = self.state.lock();
                    state
                        .connection
                        .insert(camera_id.to_owned(), ConnectionState::Error);
                    state.stats.connect_failures += 1;
                }
                let error = self.fail(ManagerError::remote(Operation::Connect, source));
                self.events.emit(CameraEvent::ConnectionError {
                    camera_id: camera_id.to_owned(),
                    message: error.to_string(),
                });
                return Err(error);
            }
        };

        let session = {
            let mut state = self.state.lock();
            let camera = reply
                .camera()
                .or_else(|| state.available.iter().find(|c| c.id == camera_id).cloned())
                .unwrap_or_else(|| CameraDescriptor::unknown(camera_id));
            let session = Session {
                session_id: reply.session_id,
                camera_id: camera_id.to_owned(),
                camera,
                device_info: reply.device_info,
                connected_at: Utc::now(),
            };

            if let Some(stale) = state.sessions.insert(session.clone()) {
                warn!(
                    camera_id,
                    session_id = %stale.session_id,
                    "replaced stale session"
                );
            }
            state.current_session_id = Some(session.session_id.clone());
            state
                .connection
                .insert(camera_id.to_owned(), ConnectionState::Connected);
            state.stats.connects += 1;
            session
        };

        info!(camera_id, session_id = %session.session_id, "camera connected");
        self.events.emit(CameraEvent::CameraConnected {
            camera_id: session.camera_id.clone(),
            session_id: session.session_id.clone(),
            camera: session.camera.clone(),
        });

        Ok(session)
    }

    /// Closes a session, the current one when `session_id` is `None`.
    ///
    /// Fails without a request when no session resolves. On failure the
    /// session stays stored and its camera enters
    /// [`ConnectionState::Error`].
    pub async fn disconnect(&self, session_id: Option<&str>) -> Result<(), ManagerError> {
        let Some(session_id) = self.resolve_session(session_id) else {
            warn!("no active session to disconnect");
            return Err(ManagerError::NoActiveSession);
        };

        let camera_id = {
            let mut state = self.state.lock();
            let camera_id = state.sessions.camera_for(&session_id).map(str::to_owned);
            if let Some(camera_id) = &camera_id {
                state
                    .connection
                    .insert(camera_id.clone(), ConnectionState::Disconnecting);
            }
            camera_id
        };
        info!(session_id = %session_id, "disconnecting camera");

        if let Err(source) = self.api.disconnect(&session_id).await {
            {
                let mut state = self.state.lock();
                if let Some(camera_id) = &camera_id {
                    state
                        .connection
                        .insert(camera_id.clone(), ConnectionState::Error);
                }
                state.stats.disconnect_failures += 1;
            }
            return Err(self.fail(ManagerError::remote(Operation::Disconnect, source)));
        }

        {
            let mut state = self.state.lock();
            if let Some(removed) = state.sessions.remove_by_session(&session_id) {
                state.settle(&removed.camera_id);
            }
            if state.current_session_id.as_deref() == Some(session_id.as_str()) {
                state.current_session_id = None;
            }
            state.stats.disconnects += 1;
        }

        info!(session_id = %session_id, "camera disconnected");
        self.events.emit(CameraEvent::CameraDisconnected {
            session_id,
            camera_id,
        });
        Ok(())
    }

    /// Makes an open session current again.
    pub fn select_session(&self, session_id: &str) -> Result<Session, ManagerError> {
        let selected = {
            let mut state = self.state.lock();
            let selected = state.sessions.get_by_session(session_id).cloned();
            if selected.is_some() {
                state.current_session_id = Some(session_id.to_owned());
            }
            selected
        };

        match selected {
            Some(session) => {
                info!(camera_id = %session.camera_id, session_id, "session selected");
                Ok(session)
            }
            None => Err(self.fail(ManagerError::UnknownSession {
                session_id: session_id.to_owned(),
            })),
        }
    }

    // ---- capture and settings -------------------------------------------

    /// Takes a photo on a session, the current one when `session_id` is
    /// `None`.
    ///
    /// The capture indicator stays raised for the duration of the request.
    pub async fn capture(&self, session_id: Option<&str>) -> Result<CaptureReply, ManagerError> {
        let Some(session_id) = self.resolve_session(session_id) else {
            self.state.lock().stats.capture_failures += 1;
            return Err(self.fail(ManagerError::NoActiveSession));
        };

        debug!(session_id = %session_id, "capturing photo");
        let result = {
            let _capturing = self.indicator.begin();
            self.api.capture(&session_id).await
        };

        let reply = match result {
            Ok(reply) => reply,
            Err(source) => {
                self.state.lock().stats.capture_failures += 1;
                return Err(self.fail(ManagerError::remote(Operation::Capture, source)));
            }
        };

        self.state.lock().stats.captures += 1;
        info!(session_id = %session_id, "photo captured");
        self.events.emit(CameraEvent::PhotoCaptured {
            session_id,
            timestamp: reply.timestamp,
            payload: reply.payload.clone(),
        });
        Ok(reply)
    }

    /// Captures on the current session, failing if there is none.
    pub async fn quick_capture(&self) -> Result<CaptureReply, ManagerError> {
        if !self.is_connected() {
            self.state.lock().stats.capture_failures += 1;
            return Err(self.fail(ManagerError::NoActiveSession));
        }
        self.capture(None).await
    }

    /// Writes a camera setting.
    pub async fn set_setting(
        &self,
        setting: CameraSetting,
        value: SettingValue,
        session_id: Option<&str>,
    ) -> Result<(), ManagerError> {
        let Some(session_id) = self.resolve_session(session_id) else {
            warn!(setting = %setting, "no active session to configure");
            return Err(ManagerError::NoActiveSession);
        };
        if !setting.is_writable() {
            return Err(self.fail(ManagerError::ReadOnlySetting(setting)));
        }

        debug!(session_id = %session_id, setting = %setting, value = %value, "writing setting");
        if let Err(source) = self.api.set_setting(&session_id, setting, &value).await {
            return Err(self.fail(ManagerError::remote(Operation::SetSetting, source)));
        }

        self.state.lock().stats.setting_changes += 1;
        info!(session_id = %session_id, setting = %setting, "setting applied");
        self.events.emit(CameraEvent::SettingChanged {
            session_id,
            setting,
            value,
        });
        Ok(())
    }

    /// Reads a camera setting straight from the service.
    pub async fn get_setting(
        &self,
        setting: CameraSetting,
        session_id: Option<&str>,
    ) -> Result<SettingValue, ManagerError> {
        let Some(session_id) = self.resolve_session(session_id) else {
            warn!(setting = %setting, "no active session to query");
            return Err(ManagerError::NoActiveSession);
        };

        self.api
            .get_setting(&session_id, setting)
            .await
            .map_err(|source| self.fail(ManagerError::remote(Operation::GetSetting, source)))
    }

    /// Sessions the service reports as open.
    pub async fn status(&self) -> Result<Vec<ActiveSessionStatus>, ManagerError> {
        self.api
            .status()
            .await
            .map_err(|source| self.fail(ManagerError::remote(Operation::Status, source)))
    }

    /// Reacts to the photobooth camera type changing.
    ///
    /// USB-driven types trigger a discovery. Other types release the
    /// current session, if any.
    pub async fn apply_camera_type(&self, camera_type: CameraType) {
        if camera_type.uses_usb_session() {
            self.detect().await;
        } else if self.is_connected() {
            // Failures are already reported.
            let _ = self.disconnect(None).await;
        }
    }

    // ---- polling and teardown -------------------------------------------

    /// Start-up sequence: one discovery, then polling every `interval`,
    /// then `controller-initialized` with the camera list.
    ///
    /// A failed discovery is reported and start-up continues with the
    /// cameras already known.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub async fn init(self: &Arc<Self>, interval: Duration) -> Vec<CameraDescriptor> {
        self.detect().await;
        self.start_polling(interval);

        let cameras = self.available_cameras();
        info!(count = cameras.len(), "camera manager initialized");
        self.events.emit(CameraEvent::ControllerInitialized {
            cameras: cameras.clone(),
        });
        cameras
    }

    /// Runs [`detect`](Self::detect) every `interval`, first one interval
    /// from now. Replaces any polling already running.
    ///
    /// The task stops by itself once the manager is dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start_polling(self: &Arc<Self>, interval: Duration) {
        let interval = interval.max(Duration::from_millis(1));
        let weak = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                manager.detect().await;
            }
        });

        if self.poller.replace(handle) {
            debug!("replaced running detection task");
        }
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        info!(interval_ms, "periodic detection started");
    }

    /// Stops periodic discovery. Returns false if it was not running.
    pub fn stop_polling(&self) -> bool {
        let stopped = self.poller.stop();
        if stopped {
            info!("periodic detection stopped");
        }
        stopped
    }

    /// Whether periodic discovery runs.
    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// Stops polling and disconnects every session, continuing past
    /// individual failures.
    pub async fn teardown(&self) {
        self.stop_polling();

        let session_ids = self.state.lock().sessions.session_ids();
        let total = session_ids.len();
        let mut failed = 0;
        for session_id in session_ids {
            if self.disconnect(Some(&session_id)).await.is_err() {
                failed += 1;
            }
        }

        info!(sessions = total, failed, "camera manager torn down");
    }

    // ---- accessors -------------------------------------------------------

    /// Subscribes to notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<CameraEvent> {
        self.events.subscribe()
    }

    /// Observes the capture-in-progress flag.
    pub fn capture_indicator(&self) -> watch::Receiver<bool> {
        self.indicator.subscribe()
    }

    /// Whether a capture is outstanding.
    pub fn is_capturing(&self) -> bool {
        self.indicator.is_active()
    }

    /// Cameras from the latest successful discovery.
    pub fn available_cameras(&self) -> Vec<CameraDescriptor> {
        self.state.lock().available.clone()
    }

    /// The session held by a camera.
    pub fn session(&self, camera_id: &str) -> Option<Session> {
        self.state.lock().sessions.get(camera_id).cloned()
    }

    /// All open sessions, ordered by connect time.
    pub fn sessions(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.state.lock().sessions.iter().cloned().collect();
        sessions.sort_by_key(|session| session.connected_at);
        sessions
    }

    /// The session targeted when none is given.
    pub fn current_session_id(&self) -> Option<String> {
        self.state.lock().current_session_id.clone()
    }

    /// The current session.
    pub fn connected_camera(&self) -> Option<Session> {
        let state = self.state.lock();
        let session_id = state.current_session_id.as_deref()?;
        state.sessions.get_by_session(session_id).cloned()
    }

    /// Whether a current session exists.
    pub fn is_connected(&self) -> bool {
        self.state.lock().current_session_id.is_some()
    }

    /// Connection state of a camera.
    pub fn camera_state(&self, camera_id: &str) -> ConnectionState {
        self.state
            .lock()
            .connection
            .get(camera_id)
            .copied()
            .unwrap_or(ConnectionState::Unknown)
    }

    /// Operation counters.
    pub fn stats(&self) -> ManagerStats {
        self.state.lock().stats.clone()
    }

    /// Everything a status page needs, in one snapshot.
    pub fn snapshot(&self) -> ManagerStatus {
        let (available_cameras, current_session_id, stats) = {
            let state = self.state.lock();
            (
                state.available.clone(),
                state.current_session_id.clone(),
                state.stats.clone(),
            )
        };

        ManagerStatus {
            available_cameras,
            sessions: self.sessions(),
            current_session_id,
            polling: self.is_polling(),
            capturing: self.is_capturing(),
            stats,
        }
    }
}

impl std::fmt::Debug for CameraSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CameraSessionManager")
            .field("available_cameras", &state.available.len())
            .field("sessions", &state.sessions.len())
            .field("current_session_id", &state.current_session_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MockCameraApi, RemoteError};
    use serde_json::json;

    #[derive(Default)]
    struct RecordingSink {
        errors: Mutex<Vec<ManagerError>>,
    }

    impl RecordingSink {
        fn messages(&self) -> Vec<String> {
            self.errors.lock().iter().map(ToString::to_string).collect()
        }
    }

    impl ErrorSink for RecordingSink {
        fn report(&self, error: &ManagerError) {
            self.errors.lock().push(error.clone());
        }
    }

    struct Harness {
        api: Arc<MockCameraApi>,
        sink: Arc<RecordingSink>,
        manager: Arc<CameraSessionManager>,
        events: broadcast::Receiver<CameraEvent>,
    }

    fn camera(id: &str) -> CameraDescriptor {
        CameraDescriptor::new(id, format!("Model {id}"), "Vendor")
    }

    fn harness_with(api: MockCameraApi) -> Harness {
        let api = Arc::new(api);
        let sink = Arc::new(RecordingSink::default());
        let manager = Arc::new(
            CameraSessionManager::new(api.clone()).with_error_sink(sink.clone()),
        );
        let events = manager.subscribe();
        Harness {
            api,
            sink,
            manager,
            events,
        }
    }

    fn harness(ids: &[&str]) -> Harness {
        harness_with(MockCameraApi::with_cameras(ids.iter().map(|id| camera(id)).collect()))
    }

    fn drain(events: &mut broadcast::Receiver<CameraEvent>) -> Vec<&'static str> {
        let mut names = Vec::new();
        while let Ok(event) = events.try_recv() {
            names.push(event.name());
        }
        names
    }

    #[tokio::test]
    async fn test_detect_fires_refresh_only_when_count_changes() {
        let mut h = harness(&["cam-1", "cam-2"]);

        assert_eq!(h.manager.detect().await.len(), 2);
        assert_eq!(drain(&mut h.events), vec!["cameras-detected"]);

        h.manager.detect().await;
        assert!(drain(&mut h.events).is_empty());

        h.api.set_cameras(vec![camera("cam-1")]);
        h.manager.detect().await;
        assert_eq!(drain(&mut h.events), vec!["cameras-detected"]);
    }

    #[tokio::test]
    async fn test_same_count_different_cameras_still_replaces_list() {
        let mut h = harness(&["cam-1"]);
        h.manager.detect().await;
        drain(&mut h.events);

        h.api.set_cameras(vec![camera("cam-2")]);
        let cameras = h.manager.detect().await;

        assert_eq!(cameras[0].id, "cam-2");
        assert_eq!(h.manager.available_cameras()[0].id, "cam-2");
        assert!(drain(&mut h.events).is_empty());
    }

    #[tokio::test]
    async fn test_detect_failure_keeps_previous_list() {
        let mut h = harness(&["cam-1"]);
        h.manager.detect().await;
        drain(&mut h.events);

        h.api
            .fail_next(Operation::Discover, RemoteError::Transport("timed out".into()));
        assert!(h.manager.detect().await.is_empty());

        assert_eq!(h.manager.available_cameras().len(), 1);
        assert!(drain(&mut h.events).is_empty());
        assert_eq!(h.sink.messages().len(), 1);
        assert_eq!(h.manager.stats().detection_failures, 1);
    }

    #[tokio::test]
    async fn test_try_detect_distinguishes_failure_from_empty() {
        let h = harness(&[]);
        assert!(h.manager.try_detect().await.unwrap().is_empty());

        h.api.fail_next(
            Operation::Discover,
            RemoteError::Application("usb backend unavailable".into()),
        );
        let err = h.manager.try_detect().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "error detecting cameras: usb backend unavailable"
        );
    }

    #[tokio::test]
    async fn test_connect_stores_session_and_sets_current() {
        let mut h = harness(&["cam-1"]);
        h.manager.detect().await;
        drain(&mut h.events);

        let session = h.manager.connect("cam-1", Some("42")).await.unwrap();

        assert_eq!(session.session_id, "s-1");
        assert_eq!(h.manager.session("cam-1").unwrap().session_id, "s-1");
        assert_eq!(h.manager.current_session_id().as_deref(), Some("s-1"));
        assert_eq!(h.manager.camera_state("cam-1"), ConnectionState::Connected);
        assert_eq!(drain(&mut h.events), vec!["camera-connected"]);
    }

    #[tokio::test]
    async fn test_disconnect_without_argument_clears_current() {
        let h = harness(&["cam-1"]);
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();

        h.manager.disconnect(None).await.unwrap();

        assert!(h.manager.session("cam-1").is_none());
        assert_eq!(h.manager.current_session_id(), None);
        assert_eq!(h.manager.camera_state("cam-1"), ConnectionState::Available);
    }

    #[tokio::test]
    async fn test_disconnect_without_session_makes_no_request() {
        let h = harness(&["cam-1"]);
        let err = h.manager.disconnect(None).await.unwrap_err();

        assert_eq!(err, ManagerError::NoActiveSession);
        assert_eq!(h.api.calls(Operation::Disconnect), 0);
    }

    #[tokio::test]
    async fn test_capture_without_session_makes_no_request() {
        let mut h = harness(&["cam-1"]);
        let err = h.manager.capture(None).await.unwrap_err();

        assert_eq!(err, ManagerError::NoActiveSession);
        assert_eq!(h.api.calls(Operation::Capture), 0);
        assert_eq!(h.sink.messages(), vec!["no camera connected"]);
        assert!(drain(&mut h.events).is_empty());
    }

    #[tokio::test]
    async fn test_stop_polling_twice_is_noop() {
        let h = harness(&["cam-1"]);
        h.manager.start_polling(Duration::from_secs(5));

        assert!(h.manager.stop_polling());
        assert!(!h.manager.stop_polling());
        assert!(!h.manager.is_polling());
    }

    #[tokio::test]
    async fn test_full_session_scenario() {
        let mut h = harness(&["cam-3", "cam-7"]);

        h.manager.detect().await;
        h.manager.connect("cam-7", None).await.unwrap();
        h.manager.capture(None).await.unwrap();
        h.manager.disconnect(None).await.unwrap();

        assert!(h.manager.sessions().is_empty());
        assert_eq!(h.manager.current_session_id(), None);

        let names = drain(&mut h.events);
        for name in ["camera-connected", "photo-captured", "camera-disconnected"] {
            assert_eq!(names.iter().filter(|n| **n == name).count(), 1, "{name}");
        }
        assert!(h.sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_setting_round_trip_reflects_backend() {
        let mut h = harness(&["cam-1"]);
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();
        drain(&mut h.events);

        h.manager
            .set_setting(CameraSetting::Iso, json!(400), None)
            .await
            .unwrap();
        let value = h.manager.get_setting(CameraSetting::Iso, None).await.unwrap();

        assert_eq!(value, json!(400));
        assert_eq!(drain(&mut h.events), vec!["setting-changed"]);
        assert_eq!(h.api.calls(Operation::GetSetting), 1);
    }

    #[tokio::test]
    async fn test_read_only_setting_rejected_locally() {
        let h = harness(&["cam-1"]);
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();

        let err = h
            .manager
            .set_setting(CameraSetting::BatteryLevel, json!(50), None)
            .await
            .unwrap_err();

        assert_eq!(err, ManagerError::ReadOnlySetting(CameraSetting::BatteryLevel));
        assert_eq!(h.api.calls(Operation::SetSetting), 0);
    }

    #[tokio::test]
    async fn test_get_setting_failure_reported() {
        let h = harness(&["cam-1"]);
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();

        // Nothing written yet, so the service has no value to return.
        assert!(h
            .manager
            .get_setting(CameraSetting::Aperture, None)
            .await
            .is_err());
        assert_eq!(h.sink.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_emits_connection_error() {
        let mut h = harness(&["cam-1"]);
        h.manager.detect().await;
        drain(&mut h.events);

        let err = h.manager.connect("cam-9", None).await.unwrap_err();

        assert_eq!(err.to_string(), "error connecting camera: camera not found");
        assert!(h.manager.sessions().is_empty());
        assert_eq!(h.manager.current_session_id(), None);
        assert_eq!(h.manager.camera_state("cam-9"), ConnectionState::Error);
        assert_eq!(drain(&mut h.events), vec!["connection-error"]);
        assert_eq!(h.sink.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_error_state_recovers_on_fresh_connect() {
        let h = harness(&["cam-1"]);
        h.manager.detect().await;
        h.api
            .fail_next(Operation::Connect, RemoteError::Transport("reset".into()));

        assert!(h.manager.connect("cam-1", None).await.is_err());
        assert_eq!(h.manager.camera_state("cam-1"), ConnectionState::Error);

        h.manager.connect("cam-1", None).await.unwrap();
        assert_eq!(h.manager.camera_state("cam-1"), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_empty_camera_id_makes_no_request() {
        let h = harness(&["cam-1"]);
        let err = h.manager.connect("", None).await.unwrap_err();

        assert_eq!(err, ManagerError::EmptyCameraId);
        assert_eq!(h.api.calls(Operation::Connect), 0);
    }

    #[tokio::test]
    async fn test_connected_camera_rejects_second_connect() {
        let h = harness(&["cam-1"]);
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();

        let err = h.manager.connect("cam-1", None).await.unwrap_err();

        assert_eq!(
            err,
            ManagerError::AlreadyConnected {
                camera_id: "cam-1".into(),
                session_id: "s-1".into(),
            }
        );
        assert_eq!(h.api.calls(Operation::Connect), 1);
        assert_eq!(h.api.open_sessions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_connect_rejects_duplicate() {
        let h = harness_with(
            MockCameraApi::with_cameras(vec![camera("cam-1")])
                .with_latency(Duration::from_millis(200)),
        );
        h.manager.detect().await;

        let manager = h.manager.clone();
        let first = tokio::spawn(async move { manager.connect("cam-1", None).await });
        while h.manager.camera_state("cam-1") != ConnectionState::Connecting {
            tokio::task::yield_now().await;
        }

        let err = h.manager.connect("cam-1", None).await.unwrap_err();
        assert!(matches!(err, ManagerError::ConnectInFlight { .. }));

        first.await.unwrap().unwrap();
        assert_eq!(h.api.calls(Operation::Connect), 1);
        assert_eq!(h.manager.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_connects_to_different_cameras_are_independent() {
        let h = harness(&["cam-1", "cam-2"]);
        h.manager.detect().await;

        let (a, b) = tokio::join!(
            h.manager.connect("cam-1", None),
            h.manager.connect("cam-2", None)
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(h.manager.sessions().len(), 2);
        assert!(h.manager.current_session_id().is_some());
    }

    #[tokio::test]
    async fn test_disconnect_failure_leaves_store_unchanged() {
        let mut h = harness(&["cam-1"]);
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();
        drain(&mut h.events);
        h.api.fail_next(
            Operation::Disconnect,
            RemoteError::Application("device busy".into()),
        );

        assert!(h.manager.disconnect(None).await.is_err());

        assert_eq!(h.manager.session("cam-1").unwrap().session_id, "s-1");
        assert_eq!(h.manager.current_session_id().as_deref(), Some("s-1"));
        assert_eq!(h.manager.camera_state("cam-1"), ConnectionState::Error);
        assert!(drain(&mut h.events).is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_non_current_keeps_current() {
        let h = harness(&["cam-1", "cam-2"]);
        h.manager.detect().await;
        let first = h.manager.connect("cam-1", None).await.unwrap();
        h.manager.connect("cam-2", None).await.unwrap();

        h.manager
            .disconnect(Some(&first.session_id))
            .await
            .unwrap();

        assert!(h.manager.session("cam-1").is_none());
        assert_eq!(h.manager.current_session_id().as_deref(), Some("s-2"));
    }

    #[tokio::test]
    async fn test_capture_failure_lowers_indicator() {
        let h = harness(&["cam-1"]);
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();
        h.api
            .fail_next(Operation::Capture, RemoteError::Transport("EOF".into()));

        assert!(h.manager.capture(None).await.is_err());
        assert!(!h.manager.is_capturing());
        assert_eq!(h.manager.stats().capture_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_indicator_raised_during_capture() {
        let h = harness_with(
            MockCameraApi::with_cameras(vec![camera("cam-1")])
                .with_latency(Duration::from_millis(100)),
        );
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();
        let mut indicator = h.manager.capture_indicator();

        let manager = h.manager.clone();
        let capture = tokio::spawn(async move { manager.capture(None).await });

        indicator.changed().await.unwrap();
        assert!(*indicator.borrow_and_update());

        capture.await.unwrap().unwrap();
        assert!(!h.manager.is_capturing());
    }

    #[tokio::test]
    async fn test_quick_capture_requires_connection() {
        let h = harness(&["cam-1"]);
        assert_eq!(
            h.manager.quick_capture().await.unwrap_err(),
            ManagerError::NoActiveSession
        );

        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();
        assert!(h.manager.quick_capture().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_runs_detect_each_interval() {
        let h = harness(&["cam-1"]);
        h.manager.start_polling(Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(h.api.calls(Operation::Discover), 3);

        h.manager.stop_polling();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(h.api.calls(Operation::Discover), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarting_polling_replaces_timer() {
        let h = harness(&["cam-1"]);
        h.manager.start_polling(Duration::from_millis(100));
        h.manager.start_polling(Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(h.api.calls(Operation::Discover), 2);
        assert!(h.manager.is_polling());
    }

    #[tokio::test]
    async fn test_teardown_is_best_effort() {
        let h = harness(&["cam-1", "cam-2", "cam-3"]);
        h.manager.detect().await;
        for id in ["cam-1", "cam-2", "cam-3"] {
            h.manager.connect(id, None).await.unwrap();
        }
        h.manager.start_polling(Duration::from_secs(5));
        h.api.fail_next(
            Operation::Disconnect,
            RemoteError::Transport("connection reset".into()),
        );

        h.manager.teardown().await;

        assert!(!h.manager.is_polling());
        assert_eq!(h.api.calls(Operation::Disconnect), 3);
        assert_eq!(h.manager.sessions().len(), 1);
        assert_eq!(h.sink.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_vanished_camera_returns_to_unknown() {
        let h = harness(&["cam-1", "cam-2"]);
        h.manager.detect().await;
        h.manager.connect("cam-2", None).await.unwrap();
        assert_eq!(h.manager.camera_state("cam-1"), ConnectionState::Available);

        h.api.set_cameras(vec![]);
        h.manager.detect().await;

        assert_eq!(h.manager.camera_state("cam-1"), ConnectionState::Unknown);
        assert_eq!(h.manager.camera_state("cam-2"), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_non_usb_camera_type_releases_session() {
        let h = harness(&["cam-1"]);
        h.manager.apply_camera_type(CameraType::UsbPtp).await;
        assert_eq!(h.manager.available_cameras().len(), 1);

        h.manager.connect("cam-1", None).await.unwrap();
        h.manager.apply_camera_type(CameraType::Webcam).await;

        assert!(!h.manager.is_connected());
        assert_eq!(h.api.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_status_lists_backend_sessions() {
        let h = harness(&["cam-1"]);
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();

        let sessions = h.manager.status().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, "s-1");
        assert_eq!(sessions[0].camera_model, "Model cam-1");

        h.api
            .fail_next(Operation::Status, RemoteError::Transport("refused".into()));
        assert!(h.manager.status().await.is_err());
        assert_eq!(h.sink.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_after_failed_disconnect_closes_stale_session() {
        let mut h = harness(&["cam-1"]);
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();
        h.api.fail_next(
            Operation::Disconnect,
            RemoteError::Application("device busy".into()),
        );
        assert!(h.manager.disconnect(None).await.is_err());
        drain(&mut h.events);

        let session = h.manager.connect("cam-1", None).await.unwrap();

        assert_eq!(session.session_id, "s-2");
        assert_eq!(h.api.open_sessions(), 1);
        assert_eq!(h.manager.sessions().len(), 1);
        assert_eq!(
            drain(&mut h.events),
            vec!["camera-disconnected", "camera-connected"]
        );

        h.manager.teardown().await;
        assert_eq!(h.api.open_sessions(), 0);
        assert!(h.manager.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_reconnect_rejected_while_stale_session_stays_open() {
        let h = harness(&["cam-1"]);
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();
        for _ in 0..2 {
            h.api.fail_next(
                Operation::Disconnect,
                RemoteError::Transport("connection reset".into()),
            );
        }
        assert!(h.manager.disconnect(None).await.is_err());

        let err = h.manager.connect("cam-1", None).await.unwrap_err();

        assert_eq!(err.remote_error().map(RemoteError::is_transport), Some(true));
        assert_eq!(h.api.calls(Operation::Connect), 1);
        assert_eq!(h.manager.session("cam-1").unwrap().session_id, "s-1");
        assert_eq!(h.manager.camera_state("cam-1"), ConnectionState::Error);

        h.manager.teardown().await;
        assert_eq!(h.api.open_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_disconnect_reports_disconnecting() {
        let h = harness_with(
            MockCameraApi::with_cameras(vec![camera("cam-1")])
                .with_latency(Duration::from_millis(200)),
        );
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();

        let manager = h.manager.clone();
        let pending = tokio::spawn(async move { manager.disconnect(None).await });
        while h.manager.camera_state("cam-1") != ConnectionState::Disconnecting {
            tokio::task::yield_now().await;
        }
        assert!(h.manager.session("cam-1").is_some());

        pending.await.unwrap().unwrap();
        assert_eq!(h.manager.camera_state("cam-1"), ConnectionState::Available);
        assert!(h.manager.session("cam-1").is_none());
    }

    #[tokio::test]
    async fn test_select_session_moves_current_pointer() {
        let h = harness(&["cam-1", "cam-2"]);
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();
        h.manager.connect("cam-2", None).await.unwrap();
        assert_eq!(h.manager.current_session_id().as_deref(), Some("s-2"));

        let session = h.manager.select_session("s-1").unwrap();

        assert_eq!(session.camera_id, "cam-1");
        assert_eq!(h.manager.current_session_id().as_deref(), Some("s-1"));
        h.manager.capture(None).await.unwrap();
    }

    #[tokio::test]
    async fn test_select_unknown_session_keeps_current() {
        let h = harness(&["cam-1"]);
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();

        let err = h.manager.select_session("s-9").unwrap_err();

        assert_eq!(
            err,
            ManagerError::UnknownSession {
                session_id: "s-9".into()
            }
        );
        assert_eq!(h.manager.current_session_id().as_deref(), Some("s-1"));
        assert_eq!(h.sink.messages().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_detects_polls_and_announces() {
        let mut h = harness(&["cam-1", "cam-2"]);

        let cameras = h.manager.init(Duration::from_millis(5000)).await;

        assert_eq!(cameras.len(), 2);
        assert!(h.manager.is_polling());
        assert_eq!(
            drain(&mut h.events),
            vec!["cameras-detected", "controller-initialized"]
        );
        assert_eq!(h.api.calls(Operation::Discover), 1);

        tokio::time::sleep(Duration::from_millis(5100)).await;
        assert_eq!(h.api.calls(Operation::Discover), 2);
    }

    #[tokio::test]
    async fn test_init_survives_failed_discovery() {
        let mut h = harness(&["cam-1"]);
        h.api
            .fail_next(Operation::Discover, RemoteError::Transport("refused".into()));

        let cameras = h.manager.init(Duration::from_secs(5)).await;

        assert!(cameras.is_empty());
        assert!(h.manager.is_polling());
        assert_eq!(drain(&mut h.events), vec!["controller-initialized"]);
        assert_eq!(h.sink.messages().len(), 1);
        h.manager.stop_polling();
    }

    #[tokio::test]
    async fn test_connected_camera_follows_current_pointer() {
        let h = harness(&["cam-1"]);
        assert!(h.manager.connected_camera().is_none());

        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();

        let session = h.manager.connected_camera().unwrap();
        assert_eq!(session.camera_id, "cam-1");
        assert_eq!(session.camera.model, "Model cam-1");
        assert_eq!(session.device_info["manufacturer"], "Vendor");
    }

    #[tokio::test]
    async fn test_snapshot_serializes() {
        let h = harness(&["cam-1"]);
        h.manager.detect().await;
        h.manager.connect("cam-1", None).await.unwrap();

        let json = serde_json::to_value(h.manager.snapshot()).unwrap();
        assert_eq!(json["current_session_id"], "s-1");
        assert_eq!(json["sessions"][0]["camera_id"], "cam-1");
        assert_eq!(json["stats"]["connects"], 1);
    }
}
