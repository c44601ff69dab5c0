use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::detection::domain::face_engine::{FaceEngine, SharedEngine};
use crate::detection::domain::face_matcher::{FaceMatcher, LabeledDescriptors};
use crate::enrollment::domain::enrollment_source::EnrollmentSource;
use crate::shared::resource_location::ResourceLocation;
use crate::state::action::Action;
use crate::state::store::Store;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Outcome reported by the loader's worker thread.
pub enum LoaderMessage {
    Loaded { matcher: Option<FaceMatcher> },
    Failed(String),
}

pub struct LoadRequest {
    pub engine: SharedEngine,
    pub model_location: ResourceLocation,
    pub enrollment: Option<Box<dyn EnrollmentSource>>,
    pub match_threshold: f64,
}

/// Loads the engine's models, then enrolls recognition labels, once per
/// session.
///
/// The blocking work runs on a worker thread. Its single outcome is applied
/// to the store by [`ModelLoader::poll`] on the caller's thread.
pub struct ModelLoader {
    phase: LoadPhase,
    outcome: Option<Receiver<LoaderMessage>>,
    worker: Option<JoinHandle<()>>,
    matcher: Option<FaceMatcher>,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self {
            phase: LoadPhase::Idle,
            outcome: None,
            worker: None,
            matcher: None,
        }
    }

    /// Starts the load. Returns `false` without doing anything if a load
    /// already ran or is running.
    pub fn start(&mut self, store: &mut Store, request: LoadRequest) -> bool {
        if self.phase != LoadPhase::Idle {
            return false;
        }
        store.dispatch(Action::SetModelLoading(true));
        store.dispatch(Action::SetModelError(None));
        self.phase = LoadPhase::Loading;

        let (tx, rx) = crossbeam_channel::bounded(1);
        let spawned = std::thread::Builder::new()
            .name("model-loader".to_string())
            .spawn(move || {
                let _ = tx.send(load(request));
            });
        match spawned {
            Ok(handle) => {
                self.outcome = Some(rx);
                self.worker = Some(handle);
            }
            Err(e) => {
                self.settle(store, LoaderMessage::Failed(failure_message(&e)));
            }
        }
        true
    }

    /// Applies the outcome if the worker has reported. Returns `true` when
    /// the load settled during this call.
    pub fn poll(&mut self, store: &mut Store) -> bool {
        let Some(rx) = &self.outcome else {
            return false;
        };
        let message = match rx.try_recv() {
            Ok(message) => message,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => {
                LoaderMessage::Failed(failure_message(&"loader exited without a result"))
            }
        };
        self.settle(store, message);
        true
    }

    /// Blocks up to `timeout` for the outcome. Returns `true` once settled,
    /// whether by this call or earlier.
    pub fn wait(&mut self, store: &mut Store, timeout: Duration) -> bool {
        let Some(rx) = &self.outcome else {
            return self.is_settled();
        };
        let message = match rx.recv_timeout(timeout) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => return false,
            Err(RecvTimeoutError::Disconnected) => {
                LoaderMessage::Failed(failure_message(&"loader exited without a result"))
            }
        };
        self.settle(store, message);
        true
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn is_loaded(&self) -> bool {
        self.phase == LoadPhase::Ready
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.phase, LoadPhase::Ready | LoadPhase::Failed)
    }

    /// `None` means recognition is disabled.
    pub fn matcher(&self) -> Option<&FaceMatcher> {
        self.matcher.as_ref()
    }

    fn settle(&mut self, store: &mut Store, message: LoaderMessage) {
        self.outcome = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Model loader thread panicked");
            }
        }
        match message {
            LoaderMessage::Loaded { matcher } => {
                self.matcher = matcher;
                self.phase = LoadPhase::Ready;
                log::info!("Models ready");
            }
            LoaderMessage::Failed(error) => {
                log::error!("{error}");
                self.phase = LoadPhase::Failed;
                store.dispatch(Action::SetModelError(Some(error)));
            }
        }
        store.dispatch(Action::SetModelLoading(false));
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn failure_message(error: &dyn std::fmt::Display) -> String {
    format!("Failed to load models: {error}")
}

fn load(request: LoadRequest) -> LoaderMessage {
    let mut engine = match request.engine.lock() {
        Ok(engine) => engine,
        Err(_) => return LoaderMessage::Failed(failure_message(&"engine lock poisoned")),
    };
    log::info!("Loading models from {}", request.model_location);
    if let Err(e) = engine.load_resources(&request.model_location) {
        return LoaderMessage::Failed(failure_message(&e));
    }

    let matcher = match &request.enrollment {
        Some(source) => enroll(&mut **engine, source.as_ref(), request.match_threshold),
        None => None,
    };
    LoaderMessage::Loaded { matcher }
}

/// Builds the matcher from one reference image per label. Labels that fail
/// to load or contain no face are skipped.
pub fn enroll(
    engine: &mut dyn FaceEngine,
    source: &dyn EnrollmentSource,
    threshold: f64,
) -> Option<FaceMatcher> {
    let mut labeled = Vec::new();
    for label in source.labels() {
        let frame = match source.load(&label) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Could not load enrollment image for {label}: {e}");
                continue;
            }
        };
        let descriptor = match engine.detect_single(&frame) {
            Ok(Some(face)) => face.descriptor,
            Ok(None) => None,
            Err(e) => {
                log::warn!("Enrollment detection failed for {label}: {e}");
                continue;
            }
        };
        match descriptor {
            Some(descriptor) => labeled.push(LabeledDescriptors::new(label, vec![descriptor])),
            None => log::warn!("No face detected for {label}; it will not be recognized"),
        }
    }

    let enrolled = labeled.len();
    let matcher = FaceMatcher::new(labeled, threshold);
    match &matcher {
        Some(_) => log::info!("Face matcher ready with {enrolled} label(s)"),
        None => log::info!("No labeled faces enrolled; recognition disabled"),
    }
    matcher
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_engine::{share, DetectionOptions};
    use crate::detection::domain::face_observation::FaceObservation;
    use crate::enrollment::domain::enrollment_source::EnrollmentError;
    use crate::shared::frame::Frame;
    use crate::shared::geometry::FaceBox;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns one face whose descriptor is the frame's first red byte.
    struct StubEngine {
        fail_load: bool,
        loads: Arc<AtomicUsize>,
    }

    impl FaceEngine for StubEngine {
        fn load_resources(
            &mut self,
            _location: &ResourceLocation,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_load {
                return Err("model file not found: /models/detector.onnx".into());
            }
            Ok(())
        }

        fn detect_all(
            &mut self,
            frame: &Frame,
            _options: &DetectionOptions,
        ) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
            let red = frame.data()[0];
            if red == 0 {
                return Ok(vec![]);
            }
            let mut face = FaceObservation::new(FaceBox::new(0.0, 0.0, 1.0, 1.0), 0.9);
            face.descriptor = Some(vec![red as f32]);
            Ok(vec![face])
        }
    }

    struct MapSource {
        images: HashMap<String, Frame>,
        labels: Vec<String>,
    }

    impl EnrollmentSource for MapSource {
        fn labels(&self) -> Vec<String> {
            self.labels.clone()
        }

        fn load(&self, label: &str) -> Result<Frame, EnrollmentError> {
            self.images
                .get(label)
                .cloned()
                .ok_or_else(|| EnrollmentError::Missing {
                    label: label.to_string(),
                    location: format!("/images/{label}/{label}.jpg"),
                })
        }
    }

    fn request(fail_load: bool, loads: Arc<AtomicUsize>) -> LoadRequest {
        LoadRequest {
            engine: share(Box::new(StubEngine { fail_load, loads })),
            model_location: ResourceLocation::parse("/models"),
            enrollment: None,
            match_threshold: 0.6,
        }
    }

    #[test]
    fn test_successful_load_clears_loading_flag() {
        let mut store = Store::new();
        let mut loader = ModelLoader::new();
        assert!(loader.start(&mut store, request(false, Arc::default())));
        assert!(store.state().is_model_loading);

        assert!(loader.wait(&mut store, Duration::from_secs(5)));
        assert!(loader.is_loaded());
        assert!(!store.state().is_model_loading);
        assert!(store.state().model_error.is_none());
        assert!(loader.matcher().is_none());
    }

    #[test]
    fn test_failed_load_sets_terminal_model_error() {
        let mut store = Store::new();
        let mut loader = ModelLoader::new();
        loader.start(&mut store, request(true, Arc::default()));
        loader.wait(&mut store, Duration::from_secs(5));

        assert_eq!(loader.phase(), LoadPhase::Failed);
        let error = store.state().model_error.clone().unwrap();
        assert!(error.starts_with("Failed to load models:"));
        assert!(error.contains("detector.onnx"));
        assert!(!store.state().is_model_loading);
    }

    #[test]
    fn test_start_is_reentrant_guarded() {
        let loads = Arc::new(AtomicUsize::new(0));
        let mut store = Store::new();
        let mut loader = ModelLoader::new();
        assert!(loader.start(&mut store, request(false, loads.clone())));
        assert!(!loader.start(&mut store, request(false, loads.clone())));
        loader.wait(&mut store, Duration::from_secs(5));
        assert!(!loader.start(&mut store, request(false, loads.clone())));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_poll_before_start_does_nothing() {
        let mut store = Store::new();
        let mut loader = ModelLoader::new();
        assert!(!loader.poll(&mut store));
        assert_eq!(loader.phase(), LoadPhase::Idle);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_enroll_skips_missing_and_faceless_labels() {
        let mut engine = StubEngine {
            fail_load: false,
            loads: Arc::default(),
        };
        let source = MapSource {
            images: HashMap::from([
                ("chen".to_string(), Frame::filled(2, 2, [7, 0, 0])),
                ("blank".to_string(), Frame::filled(2, 2, [0, 0, 0])),
            ]),
            labels: vec!["chen".into(), "blank".into(), "james".into()],
        };
        let matcher = enroll(&mut engine, &source, 0.6).unwrap();
        assert_eq!(matcher.labels().collect::<Vec<_>>(), vec!["chen"]);
    }

    #[test]
    fn test_enroll_without_any_face_disables_recognition() {
        let mut engine = StubEngine {
            fail_load: false,
            loads: Arc::default(),
        };
        let source = MapSource {
            images: HashMap::new(),
            labels: vec!["chen".into(), "james".into()],
        };
        assert!(enroll(&mut engine, &source, 0.6).is_none());
    }

    #[test]
    fn test_load_with_enrollment_builds_matcher() {
        let mut store = Store::new();
        let mut loader = ModelLoader::new();
        let mut req = request(false, Arc::default());
        req.enrollment = Some(Box::new(MapSource {
            images: HashMap::from([("james".to_string(), Frame::filled(2, 2, [3, 0, 0]))]),
            labels: vec!["james".into()],
        }));
        loader.start(&mut store, req);
        loader.wait(&mut store, Duration::from_secs(5));
        let best = loader.matcher().unwrap().find_best_match(&[3.0]);
        assert_eq!(best.label.as_deref(), Some("james"));
    }
}
