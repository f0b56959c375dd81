use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use facecam_core::detection::domain::detector_params::{
    DetectorParams, DEFAULT_MIN_FACE_SIZE, DEFAULT_PYRAMID_SCALE_FACTOR, DEFAULT_SCORE_THRESHOLD,
    DEFAULT_WINDOW_STEP,
};
use facecam_core::shared::constants::{DEFAULT_DEVICE_INDEX, DEFAULT_TICK_PERIOD};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: u32,
    pub period_ms: u64,
    pub min_face_size: u32,
    pub score_threshold: f64,
    pub pyramid_scale: f32,
    pub window_step: u32,
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE_INDEX,
            period_ms: DEFAULT_TICK_PERIOD.as_millis() as u64,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            pyramid_scale: DEFAULT_PYRAMID_SCALE_FACTOR,
            window_step: DEFAULT_WINDOW_STEP,
            snapshot_dir: None,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Facecam").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing or unreadable files give the defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
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

    pub fn detector_params(&self) -> DetectorParams {
        DetectorParams {
            min_face_size: self.min_face_size,
            score_threshold: self.score_threshold,
            pyramid_scale_factor: self.pyramid_scale,
            window_step_x: self.window_step,
            window_step_y: self.window_step,
        }
    }
}
