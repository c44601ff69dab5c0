use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::capture::domain::camera::{Camera, StreamConstraints};
use crate::detection::domain::face_engine::{share, DetectionOptions, FaceEngine, SharedEngine};
use crate::enrollment::domain::enrollment_source::EnrollmentSource;
use crate::enrollment::infrastructure::location_enrollment_source::LocationEnrollmentSource;
use crate::pipeline::detection_loop::{CycleOutcome, DetectionLoop};
use crate::pipeline::frame_scheduler::{FrameClock, PacedClock};
use crate::pipeline::model_loader::{LoadRequest, ModelLoader};
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::webcam_controller::WebcamController;
use crate::render::domain::render_surface::RenderSurface;
use crate::shared::constants::{
    DEFAULT_CONTAINER_WIDTH, DEFAULT_MATCH_THRESHOLD, DEFAULT_MIN_CONFIDENCE, DEFAULT_MODEL_DIR,
    DEFAULT_PAINT_RATE_HZ,
};
use crate::shared::resource_location::ResourceLocation;
use crate::state::action::Action;
use crate::state::application_state::ApplicationState;
use crate::state::store::Store;

#[derive(Clone, Debug, PartialEq)]
pub struct SessionOptions {
    pub model_location: ResourceLocation,
    /// Base of the `{label}/{label}.jpg` reference images.
    pub enrollment_location: Option<ResourceLocation>,
    pub labels: Vec<String>,
    pub min_confidence: f64,
    pub match_threshold: f64,
    pub constraints: StreamConstraints,
    pub container_width: u32,
    pub paint_rate_hz: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            model_location: ResourceLocation::parse(DEFAULT_MODEL_DIR),
            enrollment_location: None,
            labels: Vec::new(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            constraints: StreamConstraints::default(),
            container_width: DEFAULT_CONTAINER_WIDTH,
            paint_rate_hz: DEFAULT_PAINT_RATE_HZ,
        }
    }
}

/// One running instance of the app: store, loader, webcam and detection
/// loop, driven from a single control thread.
pub struct Session {
    options: SessionOptions,
    store: Store,
    engine: SharedEngine,
    loader: ModelLoader,
    webcam: WebcamController,
    detection: DetectionLoop,
    enrollment: Option<Box<dyn EnrollmentSource>>,
}

impl Session {
    pub fn new(
        options: SessionOptions,
        engine: Box<dyn FaceEngine>,
        camera: Box<dyn Camera>,
        surface: Box<dyn RenderSurface>,
    ) -> Self {
        let webcam = WebcamController::new(camera, options.constraints, options.container_width);
        let detection = DetectionLoop::new(
            surface,
            Box::new(PacedClock::new(options.paint_rate_hz)),
            Box::new(NullPipelineLogger),
            DetectionOptions {
                min_confidence: options.min_confidence,
            },
        );
        Self {
            options,
            store: Store::new(),
            engine: share(engine),
            loader: ModelLoader::new(),
            webcam,
            detection,
            enrollment: None,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn FrameClock>) -> Self {
        self.detection.set_clock(clock);
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.detection.set_logger(logger);
        self
    }

    /// Overrides the enrollment source derived from the options.
    pub fn with_enrollment(mut self, source: Box<dyn EnrollmentSource>) -> Self {
        self.enrollment = Some(source);
        self
    }

    /// Kicks off model loading. Returns `false` if it already started.
    pub fn start(&mut self) -> bool {
        let enrollment = self.enrollment.take().or_else(|| {
            let base = self.options.enrollment_location.clone()?;
            if self.options.labels.is_empty() {
                return None;
            }
            Some(Box::new(LocationEnrollmentSource::new(base, self.options.labels.clone()))
                as Box<dyn EnrollmentSource>)
        });
        self.loader.start(
            &mut self.store,
            LoadRequest {
                engine: self.engine.clone(),
                model_location: self.options.model_location.clone(),
                enrollment,
                match_threshold: self.options.match_threshold,
            },
        )
    }

    /// The presentation intent: flips the webcam run flag.
    pub fn toggle_webcam(&mut self) {
        self.store.toggle_webcam();
        self.reconcile();
    }

    pub fn set_webcam_running(&mut self, running: bool) {
        self.store.dispatch(Action::SetWebcamRunning(running));
        self.reconcile();
    }

    /// Blocks until models settle or `timeout` passes, then reacts to the
    /// outcome. Returns whether loading settled.
    pub fn wait_for_models(&mut self, timeout: Duration) -> bool {
        let settled = self.loader.wait(&mut self.store, timeout);
        self.reconcile();
        settled
    }

    /// One pass of the control loop: apply a finished load, reconcile the
    /// webcam, fire the pending detection cycle.
    pub fn tick(&mut self) -> Option<CycleOutcome> {
        self.loader.poll(&mut self.store);
        self.reconcile();
        self.detection.fire(
            &mut self.store,
            &self.engine,
            &self.loader,
            self.webcam.sink(),
        )
    }

    /// Ticks at the paint rate until `stop` is set or `observe` breaks.
    pub fn run<F>(&mut self, stop: &AtomicBool, mut observe: F)
    where
        F: FnMut(&ApplicationState, Option<&CycleOutcome>) -> ControlFlow<()>,
    {
        while !stop.load(Ordering::Relaxed) {
            self.detection.wait_for_next_paint();
            let outcome = self.tick();
            if observe(self.store.state(), outcome.as_ref()).is_break() {
                break;
            }
        }
    }

    /// Stops the webcam and releases the camera.
    pub fn shutdown(&mut self) {
        if self.store.state().is_webcam_running {
            self.store.dispatch(Action::SetWebcamRunning(false));
        }
        self.webcam.stop(&mut self.detection);
    }

    pub fn state(&self) -> &ApplicationState {
        self.store.state()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn loader(&self) -> &ModelLoader {
        &self.loader
    }

    pub fn is_streaming(&self) -> bool {
        self.webcam.is_streaming()
    }

    pub fn detection(&self) -> &DetectionLoop {
        &self.detection
    }

    pub fn surface(&self) -> &dyn RenderSurface {
        self.detection.surface()
    }

    fn reconcile(&mut self) {
        self.webcam
            .reconcile(&mut self.store, &self.loader, &mut self.detection);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.webcam.stop(&mut self.detection);
    }
}
