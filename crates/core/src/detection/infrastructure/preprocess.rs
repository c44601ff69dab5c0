//! Frame-to-tensor conversions for the attribute models.

use ndarray::Array4;

use crate::shared::frame::Frame;
use crate::shared::geometry::FaceBox;

/// Square crop around the face centre with side `max(w, h) * scale`,
/// clamped to the frame.
pub fn square_face_crop(frame: &Frame, face: &FaceBox, scale: f64) -> Option<Frame> {
    let cx = face.x + face.width / 2.0;
    let cy = face.y + face.height / 2.0;
    let side = face.width.max(face.height) * scale;
    if side < 1.0 {
        return None;
    }
    frame.crop(
        (cx - side / 2.0).round() as i64,
        (cy - side / 2.0).round() as i64,
        side.round() as i64,
        side.round() as i64,
    )
}

/// Nearest-neighbour resize to `size × size`, then `(v - mean) / std`, RGB
/// planes in NCHW order.
pub fn rgb_tensor(frame: &Frame, size: usize, mean: f32, std: f32) -> Array4<f32> {
    let src = frame.as_ndarray();
    let (src_w, src_h) = (frame.width() as usize, frame.height() as usize);
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    if src_w == 0 || src_h == 0 {
        return tensor;
    }

    for y in 0..size {
        let sy = sample(y, size, src_h);
        for x in 0..size {
            let sx = sample(x, size, src_w);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[sy, sx, c]] as f32 - mean) / std;
            }
        }
    }
    tensor
}

/// Single-channel luminance tensor with raw `0..=255` values.
pub fn gray_tensor(frame: &Frame, size: usize) -> Array4<f32> {
    let src = frame.as_ndarray();
    let (src_w, src_h) = (frame.width() as usize, frame.height() as usize);
    let mut tensor = Array4::<f32>::zeros((1, 1, size, size));
    if src_w == 0 || src_h == 0 {
        return tensor;
    }

    for y in 0..size {
        let sy = sample(y, size, src_h);
        for x in 0..size {
            let sx = sample(x, size, src_w);
            let r = src[[sy, sx, 0]] as f32;
            let g = src[[sy, sx, 1]] as f32;
            let b = src[[sy, sx, 2]] as f32;
            tensor[[0, 0, y, x]] = 0.299 * r + 0.587 * g + 0.114 * b;
        }
    }
    tensor
}

fn sample(dst: usize, dst_len: usize, src_len: usize) -> usize {
    (((dst as f64 + 0.5) * src_len as f64 / dst_len as f64) as usize).min(src_len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_square_crop_is_square_inside_frame() {
        let frame = Frame::filled(200, 200, [0, 0, 0]);
        let crop = square_face_crop(&frame, &FaceBox::new(50.0, 60.0, 40.0, 80.0), 1.0).unwrap();
        assert_eq!(crop.dimensions(), (80, 80));
    }

    #[test]
    fn test_square_crop_clamps_at_edges() {
        let frame = Frame::filled(100, 100, [0, 0, 0]);
        let crop = square_face_crop(&frame, &FaceBox::new(0.0, 0.0, 40.0, 40.0), 1.5).unwrap();
        assert_eq!(crop.dimensions(), (50, 50));
    }

    #[test]
    fn test_rgb_tensor_shape_and_normalisation() {
        let frame = Frame::filled(10, 10, [255, 0, 127]);
        let t = rgb_tensor(&frame, 112, 127.5, 127.5);
        assert_eq!(t.shape(), &[1, 3, 112, 112]);
        assert_relative_eq!(t[[0, 0, 5, 5]], 1.0, epsilon = 0.01);
        assert_relative_eq!(t[[0, 1, 5, 5]], -1.0, epsilon = 0.01);
    }

    #[test]
    fn test_gray_tensor_luminance() {
        let frame = Frame::filled(8, 8, [100, 100, 100]);
        let t = gray_tensor(&frame, 64);
        assert_eq!(t.shape(), &[1, 1, 64, 64]);
        assert_relative_eq!(t[[0, 0, 0, 0]], 100.0, epsilon = 0.01);
    }
}
