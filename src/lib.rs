//! Microphone level and left/right direction detector.
//!
//! * [`audio`]    – buffer views, volume gate, RMS, direction, cpal input.
//! * [`pipeline`] – capture lifecycle and microphone permission.
//! * [`recorder`] – PCM file recording and offline analysis.
//! * [`config`]   – `settings.toml` and platform paths.
//! * [`app`]      – the egui window.

pub mod app;
pub mod audio;
pub mod config;
pub mod pipeline;
pub mod recorder;
