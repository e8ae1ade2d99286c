//! Record the microphone to a raw PCM file and analyse it afterwards.
//!
//! # Flow
//!
//! ```text
//! AudioRecorder::prepare(path) → start() → … → stop() → FinishedRecording
//!                                                          │
//!                                   analyze_file(path) ◀───┘
//!                                     └─ RecordingAnalysis { rms, direction }
//! ```
//!
//! Files are headerless 44.1 kHz stereo 16-bit little-endian PCM
//! ([`RECORDING_FORMAT`]).

pub mod analyze;
pub mod format;
pub mod writer;

pub use analyze::{analyze_file, analyze_pcm, RecordingAnalysis};
pub use format::{decode_samples, encode_sample, encode_stereo, PcmFormat, RECORDING_FORMAT};
pub use writer::{AudioRecorder, FinishedRecording, RecorderError, RecorderState};
