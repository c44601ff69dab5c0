use serde::Serialize;

/// Axis-aligned face rectangle in source-frame pixels, as reported by an engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FaceBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// Rectangle in surface coordinates, published to the store.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub top_left: (f64, f64),
    pub bottom_right: (f64, f64),
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.bottom_right.0 - self.top_left.0
    }

    pub fn height(&self) -> f64 {
        self.bottom_right.1 - self.top_left.1
    }
}

/// Uniform scale plus centring offsets that fit a source frame into a surface
/// without distorting it. The non-fitting axis is padded equally on both sides.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub draw_width: f64,
    pub draw_height: f64,
}

impl Letterbox {
    /// Returns `None` if either dimension of the source is zero.
    pub fn fit(source: (u32, u32), target: (u32, u32)) -> Option<Self> {
        let (sw, sh) = (source.0 as f64, source.1 as f64);
        let (tw, th) = (target.0 as f64, target.1 as f64);
        if sw <= 0.0 || sh <= 0.0 {
            return None;
        }

        let scale = (tw / sw).min(th / sh);
        let draw_width = sw * scale;
        let draw_height = sh * scale;
        Some(Self {
            scale,
            offset_x: (tw - draw_width) / 2.0,
            offset_y: (th - draw_height) / 2.0,
            draw_width,
            draw_height,
        })
    }

    pub fn map_box(&self, face: &FaceBox) -> BoundingBox {
        let x = face.x * self.scale + self.offset_x;
        let y = face.y * self.scale + self.offset_y;
        BoundingBox {
            top_left: (x, y),
            bottom_right: (x + face.width * self.scale, y + face.height * self.scale),
        }
    }
}

/// Surface size for a container of `container_width` showing a source of the
/// given aspect ratio.
pub fn fit_to_width(container_width: u32, source: (u32, u32)) -> (u32, u32) {
    if source.0 == 0 || source.1 == 0 {
        return (container_width, 0);
    }
    let aspect = source.0 as f64 / source.1 as f64;
    (container_width, (container_width as f64 / aspect).round() as u32)
}
