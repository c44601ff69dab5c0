use std::fs;
use std::path::{Path, PathBuf};

use facelens_core::capture::domain::camera::StreamConstraints;
use facelens_core::capture::infrastructure::ffmpeg_camera::default_device;
use facelens_core::pipeline::session::SessionOptions;
use facelens_core::shared::constants::{
    DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH, DEFAULT_CONTAINER_WIDTH,
    DEFAULT_MATCH_THRESHOLD, DEFAULT_MIN_CONFIDENCE, DEFAULT_MODEL_DIR, DEFAULT_PAINT_RATE_HZ,
};
use facelens_core::shared::resource_location::ResourceLocation;
use serde::{Deserialize, Serialize};

/// Persistent defaults for the `facelens` command. Flags override them for
/// one run; `--save-settings` writes the merged values back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model_location: String,
    pub enrollment_location: Option<String>,
    pub labels: Vec<String>,
    pub min_confidence: f64,
    pub match_threshold: f64,
    pub camera: String,
    pub width: u32,
    pub height: u32,
    pub container_width: u32,
    pub paint_rate_hz: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_location: DEFAULT_MODEL_DIR.to_string(),
            enrollment_location: None,
            labels: Vec::new(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            camera: default_device().to_string(),
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            container_width: DEFAULT_CONTAINER_WIDTH,
            paint_rate_hz: DEFAULT_PAINT_RATE_HZ,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceLens").join("settings.json"))
    }

    /// Saved settings, or defaults when none exist or they don't parse.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable settings {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = Self::config_path().ok_or("could not determine config directory")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            model_location: ResourceLocation::parse(&self.model_location),
            enrollment_location: self
                .enrollment_location
                .as_deref()
                .map(ResourceLocation::parse),
            labels: self.labels.clone(),
            min_confidence: self.min_confidence,
            match_threshold: self.match_threshold,
            constraints: StreamConstraints {
                width: self.width,
                height: self.height,
                audio: false,
            },
            container_width: self.container_width,
            paint_rate_hz: self.paint_rate_hz,
        }
    }
}
