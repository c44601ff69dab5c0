use serde::Serialize;

use crate::shared::geometry::BoundingBox;

/// One face from the most recently processed frame.
///
/// `id` is the face's position in that frame's result list. It is not stable
/// across frames.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectedFace {
    pub id: usize,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: String,
    pub emotion: Option<String>,
}

/// Everything the presentation layer renders from.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ApplicationState {
    pub is_webcam_running: bool,
    pub is_model_loading: bool,
    pub model_error: Option<String>,
    pub detection_error: Option<String>,
    pub detected_faces: Vec<DetectedFace>,
}

impl ApplicationState {
    /// The start/stop control is only usable when no load is in flight and
    /// loading did not fail.
    pub fn can_toggle_webcam(&self) -> bool {
        !self.is_model_loading && self.model_error.is_none()
    }
}
