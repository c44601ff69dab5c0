use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("no enrollment image for {label} at {location}")]
    Missing { label: String, location: String },
    #[error("failed to fetch {location}: {source}")]
    Fetch {
        location: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode {location}: {source}")]
    Decode {
        location: String,
        #[source]
        source: image::ImageError,
    },
}

/// Supplies the labelled still images recognition is enrolled from.
pub trait EnrollmentSource: Send {
    fn labels(&self) -> Vec<String>;

    fn load(&self, label: &str) -> Result<Frame, EnrollmentError>;
}
