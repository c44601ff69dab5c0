use std::path::Path;

use crate::render::domain::render_surface::{RenderSurface, SurfaceError};

/// Saves the current contents of a surface to an image file. The format
/// follows the file extension.
pub fn write_snapshot(surface: &dyn RenderSurface, path: &Path) -> Result<(), SurfaceError> {
    let frame = surface.snapshot().ok_or(SurfaceError::Empty)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(SurfaceError::OutputDir)?;
    }

    let img = frame.to_image().ok_or(SurfaceError::Empty)?;
    img.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::infrastructure::image_surface::ImageSurface;
    use crate::shared::frame::Frame;
    use crate::shared::geometry::Letterbox;

    #[test]
    fn test_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.png");
        let mut surface = ImageSurface::new(50, 50);
        let placement = Letterbox::fit((50, 50), (50, 50)).unwrap();
        surface.draw_frame(&Frame::filled(50, 50, [50, 100, 200]), &placement);

        write_snapshot(&surface, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (50, 50));
        assert_eq!(img.get_pixel(0, 0).0, [50, 100, 200]);
    }

    #[test]
    fn test_empty_surface_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_snapshot(&ImageSurface::new(0, 0), &dir.path().join("x.png")).unwrap_err();
        assert!(matches!(err, SurfaceError::Empty));
    }

    #[test]
    fn test_unknown_extension_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let surface = ImageSurface::new(4, 4);
        assert!(write_snapshot(&surface, &dir.path().join("out.notanimage")).is_err());
    }
}
