use std::time::Instant;

use crate::capture::domain::video_sink::VideoSink;
use crate::detection::domain::face_engine::{DetectionOptions, SharedEngine};
use crate::detection::domain::face_matcher::FaceMatcher;
use crate::detection::domain::face_observation::FaceObservation;
use crate::pipeline::frame_scheduler::{FrameClock, FrameHandle, FrameScheduler};
use crate::pipeline::model_loader::ModelLoader;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::render::domain::overlay::{box_style, caption_lines, caption_style, layout_caption};
use crate::render::domain::render_surface::RenderSurface;
use crate::shared::constants::UNKNOWN_LABEL;
use crate::shared::frame::Frame;
use crate::shared::geometry::Letterbox;
use crate::state::action::Action;
use crate::state::application_state::DetectedFace;
use crate::state::store::Store;

#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    /// Model or frame not ready yet.
    Skipped,
    /// Detection failed; the error is in the store.
    Failed,
    Published(usize),
}

/// Per-paint detect, annotate and publish task.
///
/// Each fired cycle requests the next paint before returning, whatever the
/// outcome; only [`DetectionLoop::cancel`] ends the loop.
pub struct DetectionLoop {
    surface: Box<dyn RenderSurface>,
    scheduler: FrameScheduler,
    clock: Box<dyn FrameClock>,
    logger: Box<dyn PipelineLogger>,
    options: DetectionOptions,
}

impl DetectionLoop {
    pub fn new(
        surface: Box<dyn RenderSurface>,
        clock: Box<dyn FrameClock>,
        logger: Box<dyn PipelineLogger>,
        options: DetectionOptions,
    ) -> Self {
        Self {
            surface,
            scheduler: FrameScheduler::new(),
            clock,
            logger,
            options,
        }
    }

    pub fn set_clock(&mut self, clock: Box<dyn FrameClock>) {
        self.clock = clock;
    }

    pub fn set_logger(&mut self, logger: Box<dyn PipelineLogger>) {
        self.logger = logger;
    }

    pub fn begin(&mut self) -> FrameHandle {
        log::debug!("Detection loop scheduled");
        self.scheduler.request()
    }

    /// Cancels the pending paint. Returns `false` if nothing was pending.
    pub fn cancel(&mut self) -> bool {
        self.scheduler.cancel_pending().is_some()
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn surface(&self) -> &dyn RenderSurface {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> &mut dyn RenderSurface {
        self.surface.as_mut()
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        self.logger.as_ref()
    }

    pub fn wait_for_next_paint(&mut self) {
        self.clock.wait_for_next_paint();
    }

    /// Runs the pending cycle, if any, and reschedules.
    pub fn fire(
        &mut self,
        store: &mut Store,
        engine: &SharedEngine,
        loader: &ModelLoader,
        sink: &VideoSink,
    ) -> Option<CycleOutcome> {
        self.scheduler.take_due()?;
        let outcome = self.run_cycle(store, engine, loader, sink);
        self.scheduler.request();
        Some(outcome)
    }

    fn run_cycle(
        &mut self,
        store: &mut Store,
        engine: &SharedEngine,
        loader: &ModelLoader,
        sink: &VideoSink,
    ) -> CycleOutcome {
        if !loader.is_loaded() {
            return CycleOutcome::Skipped;
        }
        let Some(frame) = sink.ready_frame() else {
            return CycleOutcome::Skipped;
        };

        let started = Instant::now();
        let detected = match engine.lock() {
            Ok(mut engine) => engine.detect_all(&frame, &self.options),
            Err(_) => Err("face engine lock poisoned".into()),
        };
        let observations = match detected {
            Ok(observations) => observations,
            Err(e) => {
                let message = format!("Error detecting faces: {e}");
                log::warn!("{message}");
                store.dispatch(Action::SetDetectionError(Some(message)));
                return CycleOutcome::Failed;
            }
        };
        self.logger
            .timing("detect", started.elapsed().as_secs_f64() * 1000.0);
        store.dispatch(Action::SetDetectionError(None));

        let started = Instant::now();
        let faces = self.annotate(&frame, &observations, loader.matcher());
        self.logger
            .timing("render", started.elapsed().as_secs_f64() * 1000.0);

        let count = faces.len();
        self.logger.cycle(count);
        store.dispatch(Action::UpdateDetectedFaces(faces));
        CycleOutcome::Published(count)
    }

    /// Paints the frame and one box plus caption per observation, in engine
    /// order.
    fn annotate(
        &mut self,
        frame: &Frame,
        observations: &[FaceObservation],
        matcher: Option<&FaceMatcher>,
    ) -> Vec<DetectedFace> {
        let Some(placement) = Letterbox::fit(frame.dimensions(), self.surface.size()) else {
            return Vec::new();
        };
        self.surface.draw_frame(frame, &placement);

        let mut faces = Vec::with_capacity(observations.len());
        for (id, observation) in observations.iter().enumerate() {
            let rect = placement.map_box(&observation.bbox);
            self.surface.stroke_rect(&rect, &box_style());

            let name = match (matcher, &observation.descriptor) {
                (Some(matcher), Some(descriptor)) => matcher.find_best_match(descriptor).label,
                _ => None,
            };
            let emotion = observation.expressions.dominant().map(str::to_string);
            let lines = caption_lines(
                name.as_deref().unwrap_or(UNKNOWN_LABEL),
                observation.age,
                observation.gender.as_ref(),
                emotion.as_deref(),
            );
            for (line, baseline) in layout_caption(&lines, &rect) {
                self.surface.fill_text(&line, baseline, &caption_style());
            }

            faces.push(DetectedFace {
                id,
                bbox: rect,
                confidence: observation.score,
                name,
                age: observation.age.map(|age| age.round().max(0.0) as u32),
                gender: observation
                    .gender
                    .as_ref()
                    .map(|g| g.label.clone())
                    .unwrap_or_default(),
                emotion,
            });
        }
        faces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::camera::CameraStream;
    use crate::detection::domain::face_engine::{share, FaceEngine};
    use crate::detection::domain::face_observation::{ExpressionScores, GenderEstimate};
    use crate::pipeline::frame_scheduler::ImmediateClock;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::render::infrastructure::image_surface::ImageSurface;
    use crate::shared::geometry::FaceBox;
    use crate::shared::resource_location::ResourceLocation;

    struct FixedEngine(Vec<FaceObservation>);

    impl FaceEngine for FixedEngine {
        fn load_resources(
            &mut self,
            _location: &ResourceLocation,
        ) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }

        fn detect_all(
            &mut self,
            _frame: &Frame,
            _options: &DetectionOptions,
        ) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    struct StillStream(Frame);

    impl CameraStream for StillStream {
        fn dimensions(&self) -> (u32, u32) {
            self.0.dimensions()
        }
        fn latest_frame(&self) -> Option<Frame> {
            Some(self.0.clone())
        }
        fn is_active(&self) -> bool {
            true
        }
        fn stop(&mut self) {}
    }

    fn detection_loop(width: u32, height: u32) -> DetectionLoop {
        DetectionLoop::new(
            Box::new(ImageSurface::new(width, height)),
            Box::new(ImmediateClock),
            Box::new(NullPipelineLogger),
            DetectionOptions::default(),
        )
    }

    #[test]
    fn test_fire_without_pending_request_does_nothing() {
        let mut detection = detection_loop(10, 10);
        let mut store = Store::new();
        let engine = share(Box::new(FixedEngine(vec![])));
        let outcome = detection.fire(&mut store, &engine, &ModelLoader::new(), &VideoSink::new());
        assert!(outcome.is_none());
        assert!(!detection.is_scheduled());
    }

    #[test]
    fn test_unready_model_skips_and_reschedules() {
        let mut detection = detection_loop(10, 10);
        let mut store = Store::new();
        let engine = share(Box::new(FixedEngine(vec![])));
        detection.begin();
        let outcome = detection.fire(&mut store, &engine, &ModelLoader::new(), &VideoSink::new());
        assert_eq!(outcome, Some(CycleOutcome::Skipped));
        assert!(detection.is_scheduled());
        assert_eq!(detection.scheduler().requested_count(), 2);
    }

    #[test]
    fn test_annotate_maps_attributes() {
        let mut observation = FaceObservation::new(FaceBox::new(10.0, 30.0, 20.0, 20.0), 0.8);
        observation.age = Some(41.4);
        observation.gender = Some(GenderEstimate {
            label: "male".to_string(),
            probability: 0.9,
        });
        observation.expressions = ExpressionScores::new(vec![
            ("neutral".to_string(), 0.3),
            ("sad".to_string(), 0.3),
        ]);

        let mut detection = detection_loop(200, 100);
        let frame = Frame::filled(100, 50, [9, 9, 9]);
        let faces = detection.annotate(&frame, &[observation], None);

        assert_eq!(faces.len(), 1);
        let face = &faces[0];
        assert_eq!(face.bbox.top_left, (20.0, 60.0));
        assert_eq!(face.bbox.bottom_right, (60.0, 100.0));
        assert_eq!(face.name, None);
        assert_eq!(face.age, Some(41));
        assert_eq!(face.gender, "male");
        assert_eq!(face.emotion.as_deref(), Some("neutral"));
    }

    #[test]
    fn test_frame_ignored_until_models_load() {
        let mut detection = detection_loop(10, 10);
        let mut sink = VideoSink::new();
        sink.attach(Box::new(StillStream(Frame::filled(4, 4, [1, 1, 1]))));
        let mut store = Store::new();
        let engine = share(Box::new(FixedEngine(vec![])));
        detection.begin();
        // Loader never ran, so the frame is ignored.
        let outcome = detection.fire(&mut store, &engine, &ModelLoader::new(), &sink);
        assert_eq!(outcome, Some(CycleOutcome::Skipped));
    }
}
