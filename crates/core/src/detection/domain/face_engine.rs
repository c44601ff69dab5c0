use std::sync::{Arc, Mutex};

use crate::detection::domain::face_observation::FaceObservation;
use crate::shared::constants::DEFAULT_MIN_CONFIDENCE;
use crate::shared::frame::Frame;
use crate::shared::resource_location::ResourceLocation;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionOptions {
    pub min_confidence: f64,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

/// Domain interface for the pretrained detection/recognition backend.
///
/// `&mut self` because backends hold inference sessions that are not
/// re-entrant.
pub trait FaceEngine: Send {
    /// Loads every model the backend needs from `location`.
    fn load_resources(
        &mut self,
        location: &ResourceLocation,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Full analysis of every face scoring at least `options.min_confidence`,
    /// in the backend's own order.
    fn detect_all(
        &mut self,
        frame: &Frame,
        options: &DetectionOptions,
    ) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>>;

    /// The single most confident face, used for enrollment.
    fn detect_single(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<FaceObservation>, Box<dyn std::error::Error>> {
        let faces = self.detect_all(frame, &DetectionOptions::default())?;
        Ok(faces.into_iter().max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        }))
    }
}

/// The engine is loaded on the loader's worker and then used by the
/// detection loop, so both hold it behind one lock.
pub type SharedEngine = Arc<Mutex<Box<dyn FaceEngine>>>;

pub fn share(engine: Box<dyn FaceEngine>) -> SharedEngine {
    Arc::new(Mutex::new(engine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::geometry::FaceBox;

    struct ListEngine {
        faces: Vec<FaceObservation>,
    }

    impl FaceEngine for ListEngine {
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
            Ok(self.faces.clone())
        }
    }

    #[test]
    fn test_detect_single_defaults_to_most_confident() {
        let mut engine = ListEngine {
            faces: vec![
                FaceObservation::new(FaceBox::new(0.0, 0.0, 10.0, 10.0), 0.6),
                FaceObservation::new(FaceBox::new(5.0, 5.0, 10.0, 10.0), 0.95),
                FaceObservation::new(FaceBox::new(9.0, 9.0, 10.0, 10.0), 0.7),
            ],
        };
        let best = engine
            .detect_single(&Frame::filled(4, 4, [0, 0, 0]))
            .unwrap()
            .unwrap();
        assert!((best.score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_detect_single_empty_is_none() {
        let mut engine = ListEngine { faces: vec![] };
        assert!(engine
            .detect_single(&Frame::filled(4, 4, [0, 0, 0]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_default_options_use_half_confidence() {
        assert!((DetectionOptions::default().min_confidence - 0.5).abs() < 1e-9);
    }
}
