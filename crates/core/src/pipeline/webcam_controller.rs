use crate::capture::domain::camera::{Camera, StreamConstraints};
use crate::capture::domain::video_sink::VideoSink;
use crate::pipeline::detection_loop::DetectionLoop;
use crate::pipeline::model_loader::ModelLoader;
use crate::shared::geometry::fit_to_width;
use crate::state::action::Action;
use crate::state::store::Store;

/// Detection error shown when the device stops delivering mid-session.
pub const STREAM_ENDED: &str = "Webcam stream ended";

/// Reacts to the webcam run intent: acquires and releases the camera and
/// starts the detection loop once both camera and models are ready.
pub struct WebcamController {
    camera: Box<dyn Camera>,
    sink: VideoSink,
    constraints: StreamConstraints,
    container_width: u32,
    deferred: bool,
}

impl WebcamController {
    pub fn new(camera: Box<dyn Camera>, constraints: StreamConstraints, container_width: u32) -> Self {
        Self {
            camera,
            sink: VideoSink::new(),
            constraints,
            container_width,
            deferred: false,
        }
    }

    pub fn sink(&self) -> &VideoSink {
        &self.sink
    }

    pub fn is_streaming(&self) -> bool {
        self.sink.is_attached()
    }

    /// Brings camera and loop in line with the current state. Called after
    /// every intent change and on every tick.
    pub fn reconcile(
        &mut self,
        store: &mut Store,
        loader: &ModelLoader,
        detection: &mut DetectionLoop,
    ) {
        let state = store.state();
        if !state.is_webcam_running {
            self.stop(detection);
            return;
        }
        if state.model_error.is_some() {
            log::error!("Cannot start webcam: model loading failed");
            store.dispatch(Action::SetWebcamRunning(false));
            self.stop(detection);
            return;
        }
        if !loader.is_loaded() {
            if !self.deferred {
                log::info!("Webcam requested, waiting for models to load");
                self.deferred = true;
            }
            return;
        }
        self.deferred = false;

        if self.sink.is_attached() && !self.sink.is_active() {
            log::warn!("Webcam stream ended");
            self.stop(detection);
            store.dispatch(Action::SetWebcamRunning(false));
            store.dispatch(Action::SetDetectionError(Some(STREAM_ENDED.to_string())));
            return;
        }
        if !self.sink.is_attached() && !self.acquire(store, detection) {
            return;
        }
        if !detection.is_scheduled() {
            detection.begin();
        }
    }

    /// Releases everything the webcam holds. Safe to call at any time.
    pub fn stop(&mut self, detection: &mut DetectionLoop) {
        self.deferred = false;
        let cancelled = detection.cancel();
        let stream = self.sink.detach();
        if let Some(mut stream) = stream {
            stream.stop();
            log::info!("Webcam stopped");
        } else if !cancelled {
            return;
        }
        detection.surface_mut().clear();
    }

    fn acquire(&mut self, store: &mut Store, detection: &mut DetectionLoop) -> bool {
        store.dispatch(Action::SetDetectionError(None));
        match self.camera.request_stream(&self.constraints) {
            Ok(stream) => {
                let native = stream.dimensions();
                let (width, height) = fit_to_width(self.container_width, native);
                detection.surface_mut().resize(width, height);
                self.sink.attach(stream);
                log::info!(
                    "Webcam started: {}x{} shown at {width}x{height}",
                    native.0,
                    native.1
                );
                true
            }
            Err(e) => {
                log::warn!("Error accessing webcam: {e}");
                // Stopping clears the detection error, so it goes first.
                store.dispatch(Action::SetWebcamRunning(false));
                store.dispatch(Action::SetDetectionError(Some(format!(
                    "Failed to access webcam: {e}"
                ))));
                false
            }
        }
    }
}
