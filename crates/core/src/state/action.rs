use crate::state::application_state::DetectedFace;

/// Every state transition the store understands.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    SetWebcamRunning(bool),
    SetModelLoading(bool),
    SetModelError(Option<String>),
    SetDetectionError(Option<String>),
    UpdateDetectedFaces(Vec<DetectedFace>),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetWebcamRunning(_) => "setWebcamRunning",
            Action::SetModelLoading(_) => "setModelLoading",
            Action::SetModelError(_) => "setModelError",
            Action::SetDetectionError(_) => "setDetectionError",
            Action::UpdateDetectedFaces(_) => "updateDetectedFaces",
        }
    }
}
