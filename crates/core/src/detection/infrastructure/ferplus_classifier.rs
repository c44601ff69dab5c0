/// FER+ facial expression classifier (emotion-ferplus-8).
///
/// Input is a 64×64 grayscale crop with raw `0..=255` values. The eight
/// logits are softmaxed and reported under the expression names the
/// overlay shows.
use std::path::Path;

use crate::detection::domain::face_observation::ExpressionScores;
use crate::detection::infrastructure::execution_provider::open_session;
use crate::detection::infrastructure::math::softmax;
use crate::detection::infrastructure::preprocess::{gray_tensor, square_face_crop};
use crate::shared::frame::Frame;
use crate::shared::geometry::FaceBox;

const INPUT_SIZE: usize = 64;
const CROP_SCALE: f64 = 1.0;

/// In model output order.
pub const EXPRESSIONS: [&str; 8] = [
    "neutral",
    "happy",
    "surprised",
    "sad",
    "angry",
    "disgusted",
    "fearful",
    "contempt",
];

pub struct FerPlusClassifier {
    session: ort::session::Session,
}

impl FerPlusClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: open_session(model_path)?,
        })
    }

    pub fn classify(
        &mut self,
        frame: &Frame,
        face: &FaceBox,
    ) -> Result<ExpressionScores, Box<dyn std::error::Error>> {
        let Some(crop) = square_face_crop(frame, face, CROP_SCALE) else {
            return Ok(ExpressionScores::default());
        };
        let tensor = gray_tensor(&crop, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let raw = outputs[0].try_extract_array::<f32>()?;
        let logits = raw.as_slice().ok_or("Cannot get expression slice")?;
        Ok(scores_from_logits(logits))
    }
}

fn scores_from_logits(logits: &[f32]) -> ExpressionScores {
    let n = logits.len().min(EXPRESSIONS.len());
    let probs = softmax(&logits[..n]);
    ExpressionScores::new(
        EXPRESSIONS
            .iter()
            .zip(probs)
            .map(|(name, p)| (name.to_string(), p))
            .collect(),
    )
}
