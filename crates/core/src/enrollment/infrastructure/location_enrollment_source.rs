use crate::enrollment::domain::enrollment_source::{EnrollmentError, EnrollmentSource};
use crate::shared::constants::ENROLLMENT_IMAGE_EXTENSION;
use crate::shared::frame::Frame;
use crate::shared::resource_location::ResourceLocation;

/// Reads `{base}/{label}/{label}.jpg` from a local directory or a URL.
pub struct LocationEnrollmentSource {
    base: ResourceLocation,
    labels: Vec<String>,
}

impl LocationEnrollmentSource {
    pub fn new(base: ResourceLocation, labels: Vec<String>) -> Self {
        Self { base, labels }
    }

    pub fn image_location(&self, label: &str) -> ResourceLocation {
        let file = format!("{label}.{ENROLLMENT_IMAGE_EXTENSION}");
        self.base.join(&[label, &file])
    }
}

impl EnrollmentSource for LocationEnrollmentSource {
    fn labels(&self) -> Vec<String> {
        self.labels.clone()
    }

    fn load(&self, label: &str) -> Result<Frame, EnrollmentError> {
        let location = self.image_location(label);
        let image = match &location {
            ResourceLocation::Local(path) => {
                if !path.is_file() {
                    return Err(EnrollmentError::Missing {
                        label: label.to_string(),
                        location: location.to_string(),
                    });
                }
                image::open(path).map_err(|source| EnrollmentError::Decode {
                    location: location.to_string(),
                    source,
                })?
            }
            ResourceLocation::Remote(url) => {
                let response = reqwest::blocking::get(url).map_err(|source| {
                    EnrollmentError::Fetch {
                        location: url.clone(),
                        source,
                    }
                })?;
                if response.status() == reqwest::StatusCode::NOT_FOUND {
                    return Err(EnrollmentError::Missing {
                        label: label.to_string(),
                        location: url.clone(),
                    });
                }
                let bytes = response
                    .error_for_status()
                    .and_then(|r| r.bytes())
                    .map_err(|source| EnrollmentError::Fetch {
                        location: url.clone(),
                        source,
                    })?;
                image::load_from_memory(&bytes).map_err(|source| EnrollmentError::Decode {
                    location: url.clone(),
                    source,
                })?
            }
        };
        Ok(Frame::from_image(image.to_rgb8()))
    }
}
