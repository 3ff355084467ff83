// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{camera, timing};
use crate::errors::AppError;
use crate::pipelines::composite::CompositeSpec;
use crate::pipelines::photo::CaptureSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Directory name under the platform config dir
const CONFIG_DIR_NAME: &str = "photo-booth";

/// Config file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Default folder name for saving composites
pub const DEFAULT_SAVE_FOLDER: &str = "PhotoBooth";

/// What to do when grabbing or encoding a shot produces nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CaptureFailurePolicy {
    /// Skip the slot and keep going; the sequence may come out short
    Skip,
    /// Redo the slot (intermission + countdown) up to `max_attempts` times, then abort
    Retry { max_attempts: u32 },
    /// Abort the whole sequence on the first failure
    Abort,
}

impl Default for CaptureFailurePolicy {
    fn default() -> Self {
        CaptureFailurePolicy::Retry {
            max_attempts: camera::DEFAULT_CAPTURE_ATTEMPTS,
        }
    }
}

/// Delays of the capture sequence, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceTiming {
    /// First countdown value (counts down to 1, then snaps)
    pub countdown_from: u8,
    /// Hold per countdown value
    pub tick_ms: u64,
    /// Pause before every shot except the first
    pub intermission_ms: u64,
    /// Flash indicator duration
    pub flash_ms: u64,
    /// Pause after each capture, flash included
    pub post_capture_ms: u64,
    /// Hold after the last shot
    pub processing_ms: u64,
}

impl Default for SequenceTiming {
    fn default() -> Self {
        Self {
            countdown_from: timing::COUNTDOWN_FROM,
            tick_ms: timing::COUNTDOWN_TICK.as_millis() as u64,
            intermission_ms: timing::INTERMISSION.as_millis() as u64,
            flash_ms: timing::FLASH.as_millis() as u64,
            post_capture_ms: timing::POST_CAPTURE.as_millis() as u64,
            processing_ms: timing::PROCESSING.as_millis() as u64,
        }
    }
}

impl SequenceTiming {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn intermission(&self) -> Duration {
        Duration::from_millis(self.intermission_ms)
    }

    /// Flash duration, never longer than the post-capture buffer
    pub fn flash(&self) -> Duration {
        Duration::from_millis(self.flash_ms.min(self.post_capture_ms))
    }

    /// Remainder of the post-capture buffer once the flash has cleared
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.post_capture_ms.saturating_sub(self.flash_ms))
    }

    pub fn processing(&self) -> Duration {
        Duration::from_millis(self.processing_ms)
    }

    /// Scheduled time from start until the last shot has settled, for `shots` clean shots
    pub fn sequence_duration(&self, shots: usize) -> Duration {
        let shots = shots as u64;
        let per_shot = u64::from(self.countdown_from) * self.tick_ms + self.post_capture_ms;
        Duration::from_millis(shots.saturating_sub(1) * self.intermission_ms + shots * per_shot)
    }
}

/// Persisted booth configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera index among enumerated devices
    pub camera_index: usize,
    /// Ideal stream width requested from the camera
    pub ideal_width: u32,
    /// Ideal stream height requested from the camera
    pub ideal_height: u32,
    /// Mirror stills horizontally (selfie mode)
    pub mirror: bool,
    /// Still JPEG quality (0-100)
    pub jpeg_quality: u8,
    /// Capture sequence delays
    pub timing: SequenceTiming,
    /// Failed-shot handling
    pub capture_failure: CaptureFailurePolicy,
    /// Composite selection used when none is given
    pub composite: CompositeSpec,
    /// Where composites are saved (default: Pictures/PhotoBooth)
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_index: 0,
            ideal_width: camera::IDEAL_WIDTH,
            ideal_height: camera::IDEAL_HEIGHT,
            mirror: true, // Default to mirrored (selfie mode)
            jpeg_quality: camera::STILL_JPEG_QUALITY,
            timing: SequenceTiming::default(),
            capture_failure: CaptureFailurePolicy::default(),
            composite: CompositeSpec::default(),
            output_dir: None,
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load config from the default location
    ///
    /// A missing file gives defaults; a malformed file is logged and also gives defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            debug!("No config directory on this platform, using defaults");
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Write config to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Per-shot processing settings
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            mirror: self.mirror,
            jpeg_quality: self.jpeg_quality,
        }
    }

    /// Resolved output directory
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(crate::storage::default_output_dir)
    }
}
