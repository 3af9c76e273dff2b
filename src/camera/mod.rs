//! Camera model shared by the remote boundary and the session manager.
//!
//! Nothing here talks to hardware. Cameras are described by whatever the
//! backend service reports, and settings are addressed by name.

mod descriptor;
mod settings;
mod state;

pub use descriptor::CameraDescriptor;
pub use settings::{CameraSetting, SettingValue, UnknownSetting};
pub use state::{CameraType, ConnectionState};
