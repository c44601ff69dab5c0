//! Annotation layout: box style and the caption stacked next to each face.

use crate::detection::domain::face_observation::GenderEstimate;
use crate::render::domain::render_surface::{Color, StrokeStyle, TextStyle};
use crate::shared::geometry::BoundingBox;

pub const OVERLAY_COLOR: Color = Color::rgb(0x00, 0xFF, 0x00);
pub const BOX_STROKE_WIDTH: f64 = 2.0;
pub const CAPTION_SIZE_PX: f32 = 14.0;
pub const CAPTION_LINE_HEIGHT: f64 = 18.0;

/// Boxes closer than this to the top edge get their caption underneath.
const TOP_MARGIN: f64 = 20.0;
const ABOVE_GAP: f64 = 5.0;
const BELOW_GAP: f64 = 15.0;

pub fn box_style() -> StrokeStyle {
    StrokeStyle {
        color: OVERLAY_COLOR,
        width: BOX_STROKE_WIDTH,
    }
}

pub fn caption_style() -> TextStyle {
    TextStyle {
        color: OVERLAY_COLOR,
        size_px: CAPTION_SIZE_PX,
    }
}

/// Caption lines in reading order. The name is always present; zero ages
/// and empty genders are left out.
pub fn caption_lines(
    name: &str,
    age: Option<f64>,
    gender: Option<&GenderEstimate>,
    emotion: Option<&str>,
) -> Vec<String> {
    let mut lines = vec![name.to_string()];
    if let Some(age) = age.filter(|a| *a != 0.0) {
        lines.push(format!("Age: {}", age.round()));
    }
    if let Some(gender) = gender.filter(|g| !g.label.is_empty()) {
        lines.push(format!(
            "Gender: {} ({}%)",
            gender.label,
            (gender.probability * 100.0).round()
        ));
    }
    if let Some(emotion) = emotion {
        lines.push(format!("Emotion: {emotion}"));
    }
    lines
}

/// Baseline of the last caption line.
pub fn caption_anchor(rect: &BoundingBox) -> (f64, f64) {
    let (x, y) = rect.top_left;
    if y > TOP_MARGIN {
        (x, y - ABOVE_GAP)
    } else {
        (x, y + rect.height() + BELOW_GAP)
    }
}

/// Pairs each line with its baseline, laid out bottom-up from the anchor.
pub fn layout_caption(lines: &[String], rect: &BoundingBox) -> Vec<(String, (f64, f64))> {
    let (x, anchor_y) = caption_anchor(rect);
    let last = lines.len().saturating_sub(1);
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let y = anchor_y - (last - i) as f64 * CAPTION_LINE_HEIGHT;
            (line.clone(), (x, y))
        })
        .collect()
}
