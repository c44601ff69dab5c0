use ndarray::ArrayView3;

/// A single captured image: tightly packed RGB24 bytes in row-major order.
///
/// Camera adapters and enrollment sources convert into this format at the
/// boundary; engines and surfaces consume it without caring where it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * Self::CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
        }
    }

    /// Solid-colour frame, mostly useful for fakes and placeholders.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * Self::CHANNELS)
            .collect();
        Self::new(data, width, height)
    }

    pub fn from_image(image: image::RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height)
    }

    pub fn to_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `[height, width, channel]` view for tensor preprocessing.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                Self::CHANNELS,
            ),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// Copies out the axis-aligned region `[x, x + w) × [y, y + h)`, clamped
    /// to the frame. Returns `None` when the clamped region is empty.
    pub fn crop(&self, x: i64, y: i64, w: i64, h: i64) -> Option<Frame> {
        let x1 = x.clamp(0, self.width as i64) as usize;
        let y1 = y.clamp(0, self.height as i64) as usize;
        let x2 = (x + w).clamp(0, self.width as i64) as usize;
        let y2 = (y + h).clamp(0, self.height as i64) as usize;
        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let stride = self.width as usize * Self::CHANNELS;
        let mut data = Vec::with_capacity((x2 - x1) * (y2 - y1) * Self::CHANNELS);
        for row in y1..y2 {
            let start = row * stride + x1 * Self::CHANNELS;
            let end = row * stride + x2 * Self::CHANNELS;
            data.extend_from_slice(&self.data[start..end]);
        }
        Some(Frame::new(data, (x2 - x1) as u32, (y2 - y1) as u32))
    }
}
