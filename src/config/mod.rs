//! Configuration module for the microphone detector.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for capture, the
//! recorder and the window, `AppPaths` for cross-platform directories, and
//! TOML persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, CaptureConfig, RecorderConfig, UiConfig};
