use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::geometry::{BoundingBox, Letterbox};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub size_px: f32,
}

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid font file {0}")]
    InvalidFont(std::path::PathBuf),
    #[error("surface is empty")]
    Empty,
    #[error("failed to write image: {0}")]
    Write(#[from] image::ImageError),
    #[error("failed to create output directory: {0}")]
    OutputDir(#[source] std::io::Error),
}

/// 2D drawing target the detection loop paints annotated frames onto.
///
/// Coordinates are surface pixels; text is positioned by its baseline.
pub trait RenderSurface: Send {
    fn resize(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    /// Blanks the surface and forgets any overlays.
    fn clear(&mut self);

    /// Repaints the whole surface with `frame` placed by `placement`.
    fn draw_frame(&mut self, frame: &Frame, placement: &Letterbox);

    fn stroke_rect(&mut self, rect: &BoundingBox, style: &StrokeStyle);

    fn fill_text(&mut self, text: &str, baseline: (f64, f64), style: &TextStyle);

    /// Current pixels, if the surface has any.
    fn snapshot(&self) -> Option<Frame>;
}
