//! Audio input and per-buffer analysis.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → AudioBuffer → BufferProcessor
//!                                              ├─ estimate_volume (gate)
//!                                              ├─ calculate_rms
//!                                              └─ Direction::classify
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mic_detector::audio::{BufferProcessor, CpalInputSource, InputSource};
//!
//! let processor = BufferProcessor::default();
//! let mut source = CpalInputSource::new(None, None);
//! source
//!     .subscribe(Box::new(move |buffer| {
//!         if let Some(reading) = processor.process(buffer) {
//!             println!("{}", reading.direction);
//!         }
//!     }))
//!     .unwrap();
//! ```

pub mod buffer;
pub mod capture;
pub mod direction;
pub mod level;
pub mod processor;
pub mod resample;

pub use buffer::{AudioBuffer, ChannelData, ChannelSamples};
pub use capture::{BufferHandler, CaptureError, CpalInputSource, InputSource, StreamFormat};
pub use direction::Direction;
pub use level::{calculate_rms, estimate_volume, RmsPair, DEFAULT_THRESHOLD, VOLUME_STRIDE};
pub use processor::{BufferProcessor, LevelReading};
pub use resample::{split_stereo, LinearResampler};
