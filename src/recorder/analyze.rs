//! Offline analysis of a finished recording.
//!
//! Runs the same RMS calculation as the live path over the whole file and
//! classifies the dominant side.
//!
//! ```rust
//! use mic_detector::audio::Direction;
//! use mic_detector::recorder::{analyze_pcm, encode_stereo};
//!
//! let mut bytes = Vec::new();
//! encode_stereo(&[0.2; 441], &[0.6; 441], &mut bytes);
//!
//! let analysis = analyze_pcm(&bytes);
//! assert_eq!(analysis.frames, 441);
//! assert_eq!(analysis.direction, Direction::Right);
//! ```

use std::path::Path;

use crate::audio::{calculate_rms, AudioBuffer, Direction, RmsPair};

use super::format::{decode_samples, RECORDING_FORMAT};
use super::writer::RecorderError;

/// Per-channel levels of a whole recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordingAnalysis {
    /// Complete stereo frames in the file.
    pub frames: usize,
    pub duration_secs: f32,
    /// `None` for an empty recording.
    pub rms: Option<RmsPair>,
    pub direction: Direction,
}

/// Read and analyse the PCM file at `path`.
///
/// # Errors
///
/// [`RecorderError::Io`] if the file cannot be read.
pub fn analyze_file(path: &Path) -> Result<RecordingAnalysis, RecorderError> {
    let bytes = std::fs::read(path)?;
    let analysis = analyze_pcm(&bytes);

    match analysis.rms {
        Some(rms) => log::info!(
            "{}: {} frames, left RMS {:.4}, right RMS {:.4}",
            path.display(),
            analysis.frames,
            rms.left,
            rms.right
        ),
        None => log::info!("{}: empty recording", path.display()),
    }
    log::info!("{}", analysis.direction);

    Ok(analysis)
}

/// Analyse raw bytes in [`RECORDING_FORMAT`].  A trailing partial frame is
/// ignored.
pub fn analyze_pcm(bytes: &[u8]) -> RecordingAnalysis {
    let samples = decode_samples(bytes);
    let buffer = AudioBuffer::interleaved(&samples, RECORDING_FORMAT.channels);

    let rms = calculate_rms(&buffer);
    let frames = buffer.frame_length();

    RecordingAnalysis {
        frames,
        duration_secs: frames as f32 / RECORDING_FORMAT.sample_rate as f32,
        rms,
        direction: rms.map(|r| r.direction()).unwrap_or_default(),
    }
}
