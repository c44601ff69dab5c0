use thiserror::Error;

use crate::shared::constants::{DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH};
use crate::shared::frame::Frame;

/// Preferred capture settings. The device may deliver a different native
/// size; consumers read it back from [`CameraStream::dimensions`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamConstraints {
    pub width: u32,
    pub height: u32,
    pub audio: bool,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            audio: false,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("camera capture is not supported: {0}")]
    Unsupported(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("no camera available: {0}")]
    DeviceUnavailable(String),
    #[error("stream error: {0}")]
    Stream(String),
}

/// A live video stream handed out by a [`Camera`].
pub trait CameraStream: Send {
    /// Native frame size as delivered by the device.
    fn dimensions(&self) -> (u32, u32);

    /// Most recently decoded frame; `None` until the first one arrives.
    fn latest_frame(&self) -> Option<Frame>;

    fn is_active(&self) -> bool;

    /// Stops every track and releases the device. Safe to call repeatedly.
    fn stop(&mut self);
}

/// Grants video streams, the way a browser's media-devices API does.
pub trait Camera: Send {
    fn request_stream(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError>;
}
