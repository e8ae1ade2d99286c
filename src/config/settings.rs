//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`.
//! Every section is `#[serde(default)]`, so a settings file only needs the
//! keys it wants to change.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::audio::DEFAULT_THRESHOLD;
use crate::pipeline::{PermissionError, PermissionStatus};

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Settings for live microphone capture and analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Input device name; `None` means the system default.
    pub device: Option<String>,
    /// Volume estimate a buffer must exceed before RMS is computed.
    pub threshold: f32,
    /// Fixed hardware buffer size in frames.  `None` lets the host choose.
    pub buffer_frames: Option<u32>,
    /// `"ask"`, `"granted"` or `"denied"`.
    pub microphone_access: String,
    /// Start capturing as soon as the window opens.
    pub start_on_launch: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            threshold: DEFAULT_THRESHOLD,
            buffer_frames: None,
            microphone_access: PermissionStatus::Undetermined.as_config_str().into(),
            start_on_launch: true,
        }
    }
}

impl CaptureConfig {
    /// Parse `microphone_access`.
    pub fn permission(&self) -> Result<PermissionStatus, PermissionError> {
        self.microphone_access.parse()
    }
}

// ---------------------------------------------------------------------------
// RecorderConfig
// ---------------------------------------------------------------------------

/// Settings for the file recorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Show the Record button.
    pub enabled: bool,
    /// File name of the recording inside the recordings directory.
    pub file_name: String,
    /// Overrides [`AppPaths::recordings_dir`].
    pub directory: Option<PathBuf>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: "audioRecording.pcm".into(),
            directory: None,
        }
    }
}

impl RecorderConfig {
    /// Full path of the recording file.
    pub fn output_path(&self, paths: &AppPaths) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| paths.recordings_dir.clone())
            .join(&self.file_name)
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Last saved window position `(x, y)` in screen pixels.
    pub window_position: Option<(f32, f32)>,
    /// Keep the window above all other windows.
    pub always_on_top: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_position: None,
            always_on_top: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use mic_detector::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let mut config = AppConfig::load().unwrap();
/// config.capture.threshold = 0.02;
/// config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub recorder: RecorderConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
