/// InsightFace gender/age regressor.
///
/// Input is a 96×96 RGB crop with raw `0..=255` values. Output is
/// `[female_logit, male_logit, age / 100]`.
use std::path::Path;

use crate::detection::domain::face_observation::GenderEstimate;
use crate::detection::infrastructure::execution_provider::open_session;
use crate::detection::infrastructure::math::softmax;
use crate::detection::infrastructure::preprocess::{rgb_tensor, square_face_crop};
use crate::shared::frame::Frame;
use crate::shared::geometry::FaceBox;

const INPUT_SIZE: usize = 96;
const CROP_SCALE: f64 = 1.5;

pub struct GenderAgeEstimator {
    session: ort::session::Session,
}

impl GenderAgeEstimator {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: open_session(model_path)?,
        })
    }

    pub fn estimate(
        &mut self,
        frame: &Frame,
        face: &FaceBox,
    ) -> Result<Option<(GenderEstimate, f64)>, Box<dyn std::error::Error>> {
        let Some(crop) = square_face_crop(frame, face, CROP_SCALE) else {
            return Ok(None);
        };
        let tensor = rgb_tensor(&crop, INPUT_SIZE, 0.0, 1.0);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let raw = outputs[0].try_extract_array::<f32>()?;
        let values = raw.as_slice().ok_or("Cannot get gender/age slice")?;
        Ok(decode(values))
    }
}

fn decode(values: &[f32]) -> Option<(GenderEstimate, f64)> {
    if values.len() < 3 {
        return None;
    }
    let probs = softmax(&values[..2]);
    let gender = if probs[1] >= probs[0] {
        GenderEstimate {
            label: "male".to_string(),
            probability: probs[1],
        }
    } else {
        GenderEstimate {
            label: "female".to_string(),
            probability: probs[0],
        }
    };
    let age = (values[2] as f64 * 100.0).max(0.0);
    Some((gender, age))
}
