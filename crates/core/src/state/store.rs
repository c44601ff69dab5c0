use crate::state::action::Action;
use crate::state::application_state::ApplicationState;

/// Pure transition function. Total over every `(state, action)` pair.
///
/// Besides the plain field updates it keeps two invariants for every
/// reachable state: a model error and a running webcam never coexist, and
/// faces are only listed while the webcam runs.
pub fn reduce(state: &ApplicationState, action: Action) -> ApplicationState {
    let mut next = state.clone();
    match action {
        Action::SetWebcamRunning(true) => {
            if next.model_error.is_none() {
                next.is_webcam_running = true;
            }
        }
        Action::SetWebcamRunning(false) => {
            next.is_webcam_running = false;
            next.detected_faces.clear();
            next.detection_error = None;
        }
        Action::SetModelLoading(loading) => {
            next.is_model_loading = loading;
        }
        Action::SetModelError(Some(message)) => {
            // First error wins; it is terminal.
            if next.model_error.is_none() {
                next.model_error = Some(message);
            }
            next.is_webcam_running = false;
            next.detected_faces.clear();
        }
        Action::SetModelError(None) => {}
        Action::SetDetectionError(error) => {
            next.detection_error = error;
        }
        Action::UpdateDetectedFaces(faces) => {
            if next.is_webcam_running {
                next.detected_faces = faces;
            }
        }
    }
    next
}

/// Single owner of [`ApplicationState`].
#[derive(Debug, Default)]
pub struct Store {
    state: ApplicationState,
    dispatched: u64,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, action: Action) {
        log::trace!("dispatch {}", action.name());
        self.state = reduce(&self.state, action);
        self.dispatched += 1;
    }

    pub fn state(&self) -> &ApplicationState {
        &self.state
    }

    /// Number of actions applied so far. Lets observers cheaply detect change.
    pub fn revision(&self) -> u64 {
        self.dispatched
    }

    /// The presentation layer's start/stop intent.
    pub fn toggle_webcam(&mut self) {
        let running = self.state.is_webcam_running;
        self.dispatch(Action::SetWebcamRunning(!running));
    }
}
