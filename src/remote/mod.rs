//! Remote camera service boundary.
//!
//! [`CameraApi`] is the seam between the session manager and the
//! service that actually drives the cameras. [`HttpCameraApi`] speaks the
//! service's JSON-over-HTTP protocol; [`MockCameraApi`] simulates it in
//! memory.

mod api;
mod error;
mod http;
mod mock;
mod wire;

pub use api::{CameraApi, Operation};
pub use error::RemoteError;
pub use http::{Endpoint, HttpCameraApi};
pub use mock::MockCameraApi;
pub use wire::{decode_reply, ActiveSessionStatus, CaptureReply, ConnectReply};
