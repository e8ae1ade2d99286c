//! Loudness measurements over a single [`AudioBuffer`].
//!
//! | Function | Cost | Channels |
//! |----------|------|----------|
//! | [`estimate_volume`] | every 10th sample | channel 0 only |
//! | [`calculate_rms`] | every sample | left + right |
//!
//! Both are pure and allocation-free so they can run inside the real-time
//! audio callback.  The cheap estimate is used as a gate; the full RMS is only
//! computed for buffers that are loud enough to be worth classifying.
//!
//! # Example
//!
//! ```rust
//! use mic_detector::audio::{calculate_rms, estimate_volume, AudioBuffer};
//!
//! let left = vec![1.0_f32; 64];
//! let right = vec![0.5_f32; 64];
//! let channels: [&[f32]; 2] = [&left, &right];
//! let buffer = AudioBuffer::planar(&channels);
//!
//! assert!((estimate_volume(&buffer) - 1.0).abs() < 1e-6);
//!
//! let rms = calculate_rms(&buffer).unwrap();
//! assert!((rms.left - 1.0).abs() < 1e-6);
//! assert!((rms.right - 0.5).abs() < 1e-6);
//! ```

use super::buffer::{AudioBuffer, ChannelSamples};
use super::direction::Direction;

/// Only every `VOLUME_STRIDE`-th sample of channel 0 contributes to the
/// volume estimate.
pub const VOLUME_STRIDE: usize = 10;

/// Volume estimate a buffer must exceed before RMS is computed.
pub const DEFAULT_THRESHOLD: f32 = 0.01;

// ---------------------------------------------------------------------------
// Volume estimate
// ---------------------------------------------------------------------------

/// Approximate mean absolute amplitude of `buffer`.
///
/// Sums `|sample|` at frames `0, 10, 20, …` of channel 0 and divides by
/// `frame_length / 10` using integer division.  That denominator can differ
/// from the number of samples actually taken (25 frames → 3 samples, divisor
/// 2); the result is an estimate, not a mean.
///
/// Returns `0.0` for an empty buffer or one without channel data.  Buffers
/// shorter than 10 frames divide by 1, so the estimate is `|sample[0]|`.
pub fn estimate_volume(buffer: &AudioBuffer<'_>) -> f32 {
    let frame_length = buffer.frame_length();
    if frame_length == 0 || !buffer.has_channel_data() {
        return 0.0;
    }
    let Some(channel) = buffer.channel(0) else {
        return 0.0;
    };

    let sum: f32 = channel.iter().step_by(VOLUME_STRIDE).map(f32::abs).sum();
    let divisor = (frame_length / VOLUME_STRIDE).max(1);

    sum / divisor as f32
}

// ---------------------------------------------------------------------------
// RmsPair
// ---------------------------------------------------------------------------

/// Root-mean-square level of the left and right channels.
///
/// For mono input `right == left`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RmsPair {
    pub left: f32,
    pub right: f32,
}

impl RmsPair {
    /// Which side carries more energy.
    pub fn direction(&self) -> Direction {
        Direction::classify(self.left, self.right)
    }
}

// ---------------------------------------------------------------------------
// RMS
// ---------------------------------------------------------------------------

/// Per-channel RMS over the whole buffer.
///
/// Squares are accumulated in `f64` and the result narrowed back to `f32`.
/// A buffer with a single channel (or a second channel that cannot be read)
/// reports the left level for both sides.
///
/// Returns `None` when the buffer is empty or has no channel data.
pub fn calculate_rms(buffer: &AudioBuffer<'_>) -> Option<RmsPair> {
    let frame_length = buffer.frame_length();
    if frame_length == 0 || !buffer.has_channel_data() {
        return None;
    }

    let left = channel_rms(&buffer.channel(0)?, frame_length);
    let right = if buffer.channel_count() > 1 {
        buffer
            .channel(1)
            .map(|channel| channel_rms(&channel, frame_length))
            .unwrap_or(left)
    } else {
        left
    };

    Some(RmsPair {
        left: left as f32,
        right: right as f32,
    })
}

fn channel_rms(channel: &ChannelSamples<'_>, frame_length: usize) -> f64 {
    let sum_sq: f64 = channel
        .iter()
        .map(|s| {
            let v = f64::from(s);
            v * v
        })
        .sum();
    (sum_sq / frame_length as f64).sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo(left: &[f32], right: &[f32]) -> Vec<f32> {
        left.iter()
            .zip(right)
            .flat_map(|(&l, &r)| [l, r])
            .collect()
    }

    // ---- estimate_volume ---------------------------------------------------

    #[test]
    fn volume_of_empty_buffer_is_zero() {
        let buffer = AudioBuffer::interleaved(&[], 2);
        assert_eq!(estimate_volume(&buffer), 0.0);
    }

    #[test]
    fn volume_without_channel_data_is_zero() {
        let buffer = AudioBuffer::without_data(2, 1024);
        assert_eq!(estimate_volume(&buffer), 0.0);
    }

    #[test]
    fn volume_samples_every_tenth_frame() {
        // Even frames are 1.0, odd frames 0.0 → frames 0 and 10 are both 1.0.
        let left: Vec<f32> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { 0.0 }).collect();
        let buffer = AudioBuffer::interleaved(&left, 1);
        assert!((estimate_volume(&buffer) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn volume_uses_absolute_values() {
        let left = vec![-0.5_f32; 30];
        let buffer = AudioBuffer::interleaved(&left, 1);
        assert!((estimate_volume(&buffer) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn volume_keeps_integer_division_divisor() {
        // 25 frames → frames 0, 10, 20 are sampled but the divisor is 25 / 10 = 2.
        let left = vec![0.5_f32; 25];
        let buffer = AudioBuffer::interleaved(&left, 1);
        assert!((estimate_volume(&buffer) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn volume_of_short_buffer_divides_by_one() {
        let left = [0.4_f32, 0.9, 0.9, 0.9, 0.9];
        let buffer = AudioBuffer::interleaved(&left, 1);
        assert!((estimate_volume(&buffer) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn volume_reads_channel_zero_only() {
        let samples = stereo(&[0.0; 40], &[1.0; 40]);
        let buffer = AudioBuffer::interleaved(&samples, 2);
        assert_eq!(estimate_volume(&buffer), 0.0);
    }

    // ---- calculate_rms -----------------------------------------------------

    #[test]
    fn rms_of_empty_buffer_is_none() {
        let buffer = AudioBuffer::interleaved(&[], 1);
        assert!(calculate_rms(&buffer).is_none());
    }

    #[test]
    fn rms_without_channel_data_is_none() {
        let buffer = AudioBuffer::without_data(2, 256);
        assert!(calculate_rms(&buffer).is_none());
    }

    #[test]
    fn rms_of_silence_is_zero() {
        let samples = stereo(&[0.0; 100], &[0.0; 100]);
        let buffer = AudioBuffer::interleaved(&samples, 2);
        let rms = calculate_rms(&buffer).unwrap();
        assert_eq!(rms, RmsPair { left: 0.0, right: 0.0 });
    }

    #[test]
    fn rms_of_constant_channels() {
        let samples = stereo(&[1.0; 480], &[0.5; 480]);
        let buffer = AudioBuffer::interleaved(&samples, 2);
        let rms = calculate_rms(&buffer).unwrap();
        assert!((rms.left - 1.0).abs() < 1e-6, "left = {}", rms.left);
        assert!((rms.right - 0.5).abs() < 1e-6, "right = {}", rms.right);
    }

    #[test]
    fn rms_of_mono_is_duplicated() {
        let left: Vec<f32> = (0..256).map(|i| (i as f32 * 0.1).sin()).collect();
        let buffer = AudioBuffer::interleaved(&left, 1);
        let rms = calculate_rms(&buffer).unwrap();
        assert_eq!(rms.left, rms.right);
        assert!(rms.left > 0.0);
    }

    #[test]
    fn rms_of_full_scale_square_wave_is_one() {
        let left: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let buffer = AudioBuffer::interleaved(&left, 1);
        let rms = calculate_rms(&buffer).unwrap();
        assert!((rms.left - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rms_of_planar_buffer_matches_interleaved() {
        let left: Vec<f32> = (0..64).map(|i| i as f32 / 64.0).collect();
        let right: Vec<f32> = left.iter().map(|s| s * 0.25).collect();

        let channels: [&[f32]; 2] = [&left, &right];
        let planar = calculate_rms(&AudioBuffer::planar(&channels)).unwrap();

        let samples = stereo(&left, &right);
        let interleaved = calculate_rms(&AudioBuffer::interleaved(&samples, 2)).unwrap();

        assert_eq!(planar, interleaved);
    }

    #[test]
    fn rms_pair_reports_direction() {
        let pair = RmsPair { left: 0.2, right: 0.1 };
        assert_eq!(pair.direction(), Direction::Left);
    }
}
