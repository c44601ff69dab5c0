/// ArcFace face descriptor extractor using ONNX Runtime.
///
/// Produces L2-normalised 512-d embeddings from a square crop around the
/// detected face.
use std::path::Path;

use crate::detection::infrastructure::execution_provider::open_session;
use crate::detection::infrastructure::math::l2_normalize;
use crate::detection::infrastructure::preprocess::{rgb_tensor, square_face_crop};
use crate::shared::frame::Frame;
use crate::shared::geometry::FaceBox;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;
/// Detector boxes are tight; ArcFace was trained on slightly wider crops.
const CROP_SCALE: f64 = 1.2;

pub struct ArcFaceEmbedder {
    session: ort::session::Session,
}

impl ArcFaceEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: open_session(model_path)?,
        })
    }

    /// `None` when the crop falls entirely outside the frame.
    pub fn embed(
        &mut self,
        frame: &Frame,
        face: &FaceBox,
    ) -> Result<Option<Vec<f32>>, Box<dyn std::error::Error>> {
        let Some(crop) = square_face_crop(frame, face, CROP_SCALE) else {
            return Ok(None);
        };
        let tensor = rgb_tensor(&crop, INPUT_SIZE, NORM_MEAN, NORM_STD);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;

        let mut embedding = embedding_slice.to_vec();
        l2_normalize(&mut embedding);
        Ok(Some(embedding))
    }
}
