/// YOLO face detector with 5-point landmarks, via ONNX Runtime.
///
/// Handles letterbox preprocessing, inference and NMS. Output boxes and
/// landmarks are in source-frame pixels.
use std::path::Path;

use crate::detection::infrastructure::execution_provider::{declared_input_size, open_session};
use crate::detection::infrastructure::math::nms;
use crate::shared::frame::Frame;
use crate::shared::geometry::FaceBox;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f64 = 0.45;

/// 5 landmarks × (x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

/// Minimum keypoint confidence to report a landmark.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

#[derive(Clone, Debug, PartialEq)]
pub struct RawFace {
    pub bbox: FaceBox,
    pub score: f64,
    /// Visible landmarks only: left eye, right eye, nose, mouth corners.
    pub landmarks: Vec<(f64, f64)>,
}

pub struct YoloFaceDetector {
    session: ort::session::Session,
    input_size: u32,
}

impl YoloFaceDetector {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = open_session(model_path)?;
        let input_size = declared_input_size(&session).unwrap_or(DEFAULT_INPUT_SIZE);
        Ok(Self {
            session,
            input_size,
        })
    }

    /// Faces scoring at least `min_confidence`, highest score first.
    pub fn detect(
        &mut self,
        frame: &Frame,
        min_confidence: f64,
    ) -> Result<Vec<RawFace>, Box<dyn std::error::Error>> {
        let (input_tensor, lb) = letterbox(frame, self.input_size);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        // [1, features, detections] when transposed, else [1, detections, features]
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut candidates = Vec::new();
        for i in 0..num_dets {
            let row: Vec<f32> = if transposed {
                (0..num_feats).map(|f| data[f * num_dets + i]).collect()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            };
            if let Some(face) = parse_row(&row, &lb, min_confidence) {
                candidates.push(face);
            }
        }

        let boxes: Vec<([f64; 4], f64)> = candidates
            .iter()
            .map(|f| {
                (
                    [
                        f.bbox.x,
                        f.bbox.y,
                        f.bbox.x + f.bbox.width,
                        f.bbox.y + f.bbox.height,
                    ],
                    f.score,
                )
            })
            .collect();
        Ok(nms(&boxes, NMS_IOU_THRESH)
            .into_iter()
            .map(|i| candidates[i].clone())
            .collect())
    }
}

/// Letterbox geometry of the model input, for mapping back to the frame.
#[derive(Clone, Copy, Debug)]
struct InputLetterbox {
    scale: f64,
    pad_x: f64,
    pad_y: f64,
}

impl InputLetterbox {
    fn to_frame(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Row layout: `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
fn parse_row(row: &[f32], lb: &InputLetterbox, min_confidence: f64) -> Option<RawFace> {
    if row.len() < 5 {
        return None;
    }
    let score = row[4] as f64;
    if score < min_confidence {
        return None;
    }

    let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
    let (x1, y1) = lb.to_frame(cx - w / 2.0, cy - h / 2.0);
    let (x2, y2) = lb.to_frame(cx + w / 2.0, cy + h / 2.0);

    let mut landmarks = Vec::new();
    if row.len() >= 5 + NUM_KEYPOINT_VALUES {
        for k in 0..5 {
            let base = 5 + k * 3;
            if row[base + 2] as f64 >= KEYPOINT_CONF_THRESH {
                landmarks.push(lb.to_frame(row[base] as f64, row[base + 1] as f64));
            }
        }
    }

    Some(RawFace {
        bbox: FaceBox::from_corners(x1, y1, x2, y2),
        score,
        landmarks,
    })
}

/// Letterbox-resize a frame to `target_size` × `target_size`, gray padded.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, InputLetterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        InputLetterbox {
            scale,
            pad_x: pad_x as f64,
            pad_y: pad_y as f64,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → 640: scale 3.2, 640x320, 160px vertical padding
        let frame = Frame::filled(200, 100, [128, 128, 128]);
        let (tensor, lb) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(lb.scale, 3.2, epsilon = 0.01);
        assert_relative_eq!(lb.pad_x, 0.0);
        assert_relative_eq!(lb.pad_y, 160.0);
    }

    #[test]
    fn test_letterbox_pads_with_gray() {
        let frame = Frame::filled(100, 50, [255, 255, 255]);
        let (tensor, lb) = letterbox(&frame, 640);
        let y = lb.pad_y as usize + 1;
        assert_relative_eq!(tensor[[0, 0, y, 1]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 114.0 / 255.0, epsilon = 0.01);
    }

    #[test]
    fn test_parse_row_maps_back_to_frame() {
        let lb = InputLetterbox {
            scale: 2.0,
            pad_x: 0.0,
            pad_y: 80.0,
        };
        let row = [100.0, 180.0, 40.0, 40.0, 0.9];
        let face = parse_row(&row, &lb, 0.5).unwrap();
        assert_relative_eq!(face.bbox.x, 40.0);
        assert_relative_eq!(face.bbox.y, 40.0);
        assert_relative_eq!(face.bbox.width, 20.0);
        assert!(face.landmarks.is_empty());
    }

    #[test]
    fn test_parse_row_below_threshold_is_dropped() {
        let lb = InputLetterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        };
        assert!(parse_row(&[10.0, 10.0, 5.0, 5.0, 0.3], &lb, 0.5).is_none());
    }

    #[test]
    fn test_parse_row_keeps_only_confident_keypoints() {
        let lb = InputLetterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        };
        let mut row = vec![50.0, 50.0, 20.0, 20.0, 0.8];
        for k in 0..5 {
            let conf = if k == 2 { 0.1 } else { 0.9 };
            row.extend_from_slice(&[40.0 + k as f32, 45.0, conf]);
        }
        let face = parse_row(&row, &lb, 0.5).unwrap();
        assert_eq!(face.landmarks.len(), 4);
        assert_eq!(face.landmarks[0], (40.0, 45.0));
    }
}
