//! Session storage keyed by camera id, with a reverse index by session id.

use crate::camera::CameraDescriptor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// An open connection to one camera, as issued by the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    /// Opaque backend handle.
    pub session_id: String,
    /// Camera the session belongs to.
    pub camera_id: String,
    /// Camera descriptor at connect time.
    pub camera: CameraDescriptor,
    /// Device metadata reported at connect time.
    pub device_info: Value,
    /// When the session was created.
    pub connected_at: DateTime<Utc>,
}

/// Sessions indexed both ways.
///
/// A camera id is present iff it has an un-disconnected session, and the
/// two indexes always describe the same set of sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    by_camera: HashMap<String, Session>,
    camera_by_session: HashMap<String, String>,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a session, returning any session it displaced.
    ///
    /// A camera holds at most one session, and a session id belongs to at
    /// most one camera; an insert that collides on either is a replace.
    pub fn insert(&mut self, session: Session) -> Option<Session> {
        if let Some(other_camera) = self.camera_by_session.remove(&session.session_id) {
            self.by_camera.remove(&other_camera);
        }

        self.camera_by_session
            .insert(session.session_id.clone(), session.camera_id.clone());
        let displaced = self.by_camera.insert(session.camera_id.clone(), session);

        if let Some(old) = &displaced {
            self.camera_by_session.remove(&old.session_id);
        }
        displaced
    }

    /// Removes the session with the given id.
    pub fn remove_by_session(&mut self, session_id: &str) -> Option<Session> {
        let camera_id = self.camera_by_session.remove(session_id)?;
        self.by_camera.remove(&camera_id)
    }

    /// The session held by a camera.
    pub fn get(&self, camera_id: &str) -> Option<&Session> {
        self.by_camera.get(camera_id)
    }

    /// The session with the given id.
    pub fn get_by_session(&self, session_id: &str) -> Option<&Session> {
        let camera_id = self.camera_by_session.get(session_id)?;
        self.by_camera.get(camera_id)
    }

    /// Camera owning the given session id.
    pub fn camera_for(&self, session_id: &str) -> Option<&str> {
        self.camera_by_session.get(session_id).map(String::as_str)
    }

    /// Whether a session id is stored.
    pub fn contains_session(&self, session_id: &str) -> bool {
        self.camera_by_session.contains_key(session_id)
    }

    /// Iterates over stored sessions in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.by_camera.values()
    }

    /// All stored session ids.
    pub fn session_ids(&self) -> Vec<String> {
        self.camera_by_session.keys().cloned().collect()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.by_camera.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.by_camera.is_empty()
    }
}
