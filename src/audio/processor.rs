//! Per-buffer analysis run inside the capture callback.
//!
//! ```text
//! AudioBuffer ─▶ estimate_volume ─▶ (> threshold?) ─▶ calculate_rms ─▶ Direction
//! ```
//!
//! Quiet buffers stop at the gate and produce nothing.

use super::buffer::AudioBuffer;
use super::direction::Direction;
use super::level::{calculate_rms, estimate_volume, RmsPair, DEFAULT_THRESHOLD};

/// Result of analysing one buffer that passed the volume gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelReading {
    /// Decimated volume estimate of channel 0.
    pub volume: f32,
    /// Full per-channel RMS.
    pub rms: RmsPair,
    /// Dominant side according to `rms`.
    pub direction: Direction,
}

/// Volume gate + RMS + direction, with a threshold fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct BufferProcessor {
    threshold: f32,
}

impl Default for BufferProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl BufferProcessor {
    /// Negative or non-finite thresholds fall back to [`DEFAULT_THRESHOLD`].
    pub fn new(threshold: f32) -> Self {
        let threshold = if threshold.is_finite() && threshold >= 0.0 {
            threshold
        } else {
            log::warn!("invalid volume threshold {threshold}; using {DEFAULT_THRESHOLD}");
            DEFAULT_THRESHOLD
        };
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Analyse `buffer`.
    ///
    /// Returns `None` when the volume estimate does not exceed the threshold
    /// or the buffer has no usable sample data.
    ///
    /// ```
    /// use mic_detector::audio::{AudioBuffer, BufferProcessor, Direction};
    ///
    /// let processor = BufferProcessor::default();
    ///
    /// let quiet = vec![0.001_f32; 512];
    /// assert!(processor.process(&AudioBuffer::interleaved(&quiet, 2)).is_none());
    ///
    /// let loud_left: Vec<f32> = (0..256).flat_map(|_| [0.8_f32, 0.2]).collect();
    /// let reading = processor
    ///     .process(&AudioBuffer::interleaved(&loud_left, 2))
    ///     .unwrap();
    /// assert_eq!(reading.direction, Direction::Left);
    /// ```
    pub fn process(&self, buffer: &AudioBuffer<'_>) -> Option<LevelReading> {
        let volume = estimate_volume(buffer);
        if volume <= self.threshold {
            return None;
        }

        let rms = calculate_rms(buffer)?;
        log::debug!("Left RMS: {}, Right RMS: {}", rms.left, rms.right);

        let direction = rms.direction();
        log::debug!("{direction}");

        Some(LevelReading {
            volume,
            rms,
            direction,
        })
    }
}
