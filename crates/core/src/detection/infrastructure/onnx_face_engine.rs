use std::sync::Arc;

use crate::detection::domain::face_engine::{DetectionOptions, FaceEngine};
use crate::detection::domain::face_observation::FaceObservation;
use crate::detection::infrastructure::arcface_embedder::ArcFaceEmbedder;
use crate::detection::infrastructure::ferplus_classifier::FerPlusClassifier;
use crate::detection::infrastructure::genderage_estimator::GenderAgeEstimator;
use crate::detection::infrastructure::model_resolver::{self, ProgressFn};
use crate::detection::infrastructure::yolo_face_detector::YoloFaceDetector;
use crate::shared::constants::{
    EMBEDDING_MODEL_NAME, EMOTION_MODEL_NAME, GENDER_AGE_MODEL_NAME, REQUIRED_MODELS,
    YOLO_MODEL_NAME,
};
use crate::shared::frame::Frame;
use crate::shared::resource_location::ResourceLocation;

struct LoadedModels {
    detector: YoloFaceDetector,
    embedder: ArcFaceEmbedder,
    gender_age: GenderAgeEstimator,
    expressions: FerPlusClassifier,
}

/// [`FaceEngine`] backed by four ONNX models: YOLO face detection with
/// landmarks, ArcFace descriptors, InsightFace gender/age and FER+
/// expressions.
pub struct OnnxFaceEngine {
    models: Option<LoadedModels>,
    progress: Option<Arc<ModelProgressFn>>,
}

/// `(model_name, bytes_downloaded, total_bytes)`.
pub type ModelProgressFn = dyn Fn(&str, u64, u64) + Send + Sync;

impl OnnxFaceEngine {
    pub fn new() -> Self {
        Self {
            models: None,
            progress: None,
        }
    }

    /// Reports `(model_name, downloaded, total)` while remote models are fetched.
    pub fn with_progress(
        mut self,
        progress: impl Fn(&str, u64, u64) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.models.is_some()
    }

    fn resolve(
        &self,
        name: &str,
        location: &ResourceLocation,
    ) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
        let progress: Option<ProgressFn> = self.progress.clone().map(|report| {
            let name = name.to_string();
            Box::new(move |downloaded, total| report(&name, downloaded, total)) as ProgressFn
        });
        Ok(model_resolver::resolve(name, location, progress.as_ref())?)
    }
}

impl Default for OnnxFaceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceEngine for OnnxFaceEngine {
    fn load_resources(
        &mut self,
        location: &ResourceLocation,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let ResourceLocation::Local(dir) = location {
            let missing: Vec<&str> = REQUIRED_MODELS
                .iter()
                .copied()
                .filter(|name| !dir.join(name).is_file())
                .collect();
            if !missing.is_empty() {
                return Err(format!(
                    "missing model files in {}: {}",
                    dir.display(),
                    missing.join(", ")
                )
                .into());
            }
        }
        let detector = YoloFaceDetector::new(&self.resolve(YOLO_MODEL_NAME, location)?)?;
        let embedder = ArcFaceEmbedder::new(&self.resolve(EMBEDDING_MODEL_NAME, location)?)?;
        let gender_age = GenderAgeEstimator::new(&self.resolve(GENDER_AGE_MODEL_NAME, location)?)?;
        let expressions = FerPlusClassifier::new(&self.resolve(EMOTION_MODEL_NAME, location)?)?;
        log::info!("Loaded face models from {location}");
        self.models = Some(LoadedModels {
            detector,
            embedder,
            gender_age,
            expressions,
        });
        Ok(())
    }

    fn detect_all(
        &mut self,
        frame: &Frame,
        options: &DetectionOptions,
    ) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
        let models = self.models.as_mut().ok_or("face models are not loaded")?;
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let raw = models.detector.detect(frame, options.min_confidence)?;
        let mut observations = Vec::with_capacity(raw.len());
        for face in raw {
            let mut observation = FaceObservation::new(face.bbox, face.score);
            observation.landmarks = face.landmarks;
            observation.descriptor = models.embedder.embed(frame, &face.bbox)?;
            if let Some((gender, age)) = models.gender_age.estimate(frame, &face.bbox)? {
                observation.gender = Some(gender);
                observation.age = Some(age);
            }
            observation.expressions = models.expressions.classify(frame, &face.bbox)?;
            observations.push(observation);
        }
        Ok(observations)
    }
}
