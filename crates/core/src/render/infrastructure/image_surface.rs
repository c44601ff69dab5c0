use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::render::domain::render_surface::{RenderSurface, StrokeStyle, SurfaceError, TextStyle};
use crate::shared::frame::Frame;
use crate::shared::geometry::{BoundingBox, Letterbox};

/// One caption line as drawn, kept for logging and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawnText {
    pub text: String,
    pub baseline: (f64, f64),
}

/// In-memory raster surface.
///
/// Text is rasterised only when a font has been loaded; without one the
/// captions are still recorded in [`ImageSurface::captions`].
pub struct ImageSurface {
    canvas: RgbImage,
    font: Option<FontArc>,
    captions: Vec<DrawnText>,
}

impl ImageSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbImage::new(width, height),
            font: None,
            captions: Vec::new(),
        }
    }

    pub fn with_font(mut self, path: &Path) -> Result<Self, SurfaceError> {
        let bytes = std::fs::read(path).map_err(|source| SurfaceError::FontRead {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|_| SurfaceError::InvalidFont(path.to_path_buf()))?;
        self.font = Some(font);
        Ok(self)
    }

    pub fn captions(&self) -> &[DrawnText] {
        &self.captions
    }

    pub fn image(&self) -> &RgbImage {
        &self.canvas
    }
}

impl RenderSurface for ImageSurface {
    fn resize(&mut self, width: u32, height: u32) {
        if self.canvas.dimensions() != (width, height) {
            self.canvas = RgbImage::new(width, height);
        }
        self.captions.clear();
    }

    fn size(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn clear(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = Rgb([0, 0, 0]);
        }
        self.captions.clear();
    }

    fn draw_frame(&mut self, frame: &Frame, placement: &Letterbox) {
        self.clear();
        let draw_w = placement.draw_width.round() as u32;
        let draw_h = placement.draw_height.round() as u32;
        if draw_w == 0 || draw_h == 0 {
            return;
        }
        let Some(source) = frame.to_image() else {
            return;
        };
        let scaled = if source.dimensions() == (draw_w, draw_h) {
            source
        } else {
            image::imageops::resize(&source, draw_w, draw_h, image::imageops::FilterType::Triangle)
        };
        image::imageops::overlay(
            &mut self.canvas,
            &scaled,
            placement.offset_x.round() as i64,
            placement.offset_y.round() as i64,
        );
    }

    fn stroke_rect(&mut self, rect: &BoundingBox, style: &StrokeStyle) {
        let color = Rgb(style.color.to_array());
        let x = rect.top_left.0.round() as i32;
        let y = rect.top_left.1.round() as i32;
        let w = rect.width().round() as i32;
        let h = rect.height().round() as i32;
        // Concentric 1px outlines, centred on the edge like a canvas stroke.
        let lines = style.width.round().max(1.0) as i32;
        let first = -(lines / 2);
        for i in first..first + lines {
            let (rw, rh) = (w - 2 * i, h - 2 * i);
            if rw <= 0 || rh <= 0 {
                break;
            }
            draw_hollow_rect_mut(
                &mut self.canvas,
                Rect::at(x + i, y + i).of_size(rw as u32, rh as u32),
                color,
            );
        }
    }

    fn fill_text(&mut self, text: &str, baseline: (f64, f64), style: &TextStyle) {
        if let Some(font) = &self.font {
            // draw_text_mut positions the top of the line.
            let top = baseline.1 - style.size_px as f64;
            draw_text_mut(
                &mut self.canvas,
                Rgb(style.color.to_array()),
                baseline.0.round() as i32,
                top.round() as i32,
                PxScale::from(style.size_px),
                font,
                text,
            );
        }
        self.captions.push(DrawnText {
            text: text.to_string(),
            baseline,
        });
    }

    fn snapshot(&self) -> Option<Frame> {
        if self.canvas.width() == 0 || self.canvas.height() == 0 {
            return None;
        }
        Some(Frame::from_image(self.canvas.clone()))
    }
}
