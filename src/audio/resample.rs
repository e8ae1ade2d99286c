//! Sample-rate and channel-layout conversion for the recorder.
//!
//! Recordings are always written as 44.1 kHz stereo, whatever the device
//! delivers.  Two steps get there:
//!
//! 1. [`split_stereo`]: copy left/right out of any [`AudioBuffer`] into
//!    reusable vectors, duplicating mono input into both sides and ignoring
//!    channels beyond the second.
//! 2. [`LinearResampler`]: resample one channel with linear interpolation,
//!    one callback buffer at a time.

use super::buffer::AudioBuffer;

// ---------------------------------------------------------------------------
// split_stereo
// ---------------------------------------------------------------------------

/// Replace the contents of `left` and `right` with the first two channels of
/// `buffer`.
///
/// Mono buffers produce two identical channels.  A buffer without channel
/// data leaves both vectors empty.  Existing capacity is reused.
///
/// ```rust
/// use mic_detector::audio::{split_stereo, AudioBuffer};
///
/// let mono = [0.1_f32, 0.2, 0.3];
/// let (mut left, mut right) = (Vec::new(), Vec::new());
/// split_stereo(&AudioBuffer::interleaved(&mono, 1), &mut left, &mut right);
/// assert_eq!(left, right);
/// assert_eq!(left.len(), 3);
/// ```
pub fn split_stereo(buffer: &AudioBuffer<'_>, left: &mut Vec<f32>, right: &mut Vec<f32>) {
    left.clear();
    right.clear();

    let Some(first) = buffer.channel(0) else {
        return;
    };
    left.extend(first.iter());
    match buffer.channel(1) {
        Some(second) => right.extend(second.iter()),
        None => right.extend_from_slice(left),
    }
}

// ---------------------------------------------------------------------------
// LinearResampler
// ---------------------------------------------------------------------------

/// Streaming linear-interpolation resampler for one channel.
///
/// The read position and the last input sample survive between calls to
/// [`process`](Self::process), so a signal fed in pieces resamples exactly
/// like the same signal fed in one go.  Positions are kept as integer
/// frame counts and never accumulate rounding error.
///
/// An output sample is emitted once both of its neighbours have arrived,
/// so the final input frame of a stream is never interpolated past.
///
/// ```rust
/// use mic_detector::audio::LinearResampler;
///
/// let mut resampler = LinearResampler::new(48_000, 44_100);
/// let mut out = Vec::new();
/// for _ in 0..100 {
///     resampler.process(&[0.5_f32; 480], &mut out);
/// }
/// // 48 000 frames in, 44 100 frames out (± the trailing frame).
/// assert!((out.len() as i64 - 44_100).abs() <= 1);
/// ```
#[derive(Debug, Clone)]
pub struct LinearResampler {
    source_rate: u32,
    target_rate: u32,
    /// Input frames handed to earlier `process` calls.
    consumed: u64,
    /// Output frames produced so far.
    produced: u64,
    /// Last input frame of the previous call.
    last: f32,
}

impl LinearResampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        Self {
            source_rate,
            target_rate,
            consumed: 0,
            produced: 0,
            last: 0.0,
        }
    }

    /// Resample `input` and append the result to `output`.
    ///
    /// * Equal rates copy the input unchanged.
    /// * A zero rate produces nothing.
    pub fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        if self.source_rate == self.target_rate {
            output.extend_from_slice(input);
            return;
        }
        if self.source_rate == 0 || self.target_rate == 0 || input.is_empty() {
            return;
        }

        let source = u64::from(self.source_rate);
        let target = u64::from(self.target_rate);
        let start = self.consumed;
        let end = start + input.len() as u64;
        let last = self.last;

        // Absolute frame `j` is either the carried-over frame (`start - 1`)
        // or inside `input`; earlier frames are never needed.
        let frame = |j: u64| -> f32 {
            if j < start {
                last
            } else {
                input[(j - start) as usize]
            }
        };

        loop {
            let position = self.produced * source;
            let index = position / target;
            if index + 1 >= end {
                break;
            }
            let frac = (position % target) as f32 / target as f32;
            let a = frame(index);
            let b = frame(index + 1);
            output.push(a + (b - a) * frac);
            self.produced += 1;
        }

        self.consumed = end;
        self.last = input[input.len() - 1];
    }

    /// Output frames produced so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn run(resampler: &mut LinearResampler, chunks: &[&[f32]]) -> Vec<f32> {
        let mut out = Vec::new();
        for chunk in chunks {
            resampler.process(chunk, &mut out);
        }
        out
    }

    // ---- split_stereo ------------------------------------------------------

    #[test]
    fn split_stereo_two_channel() {
        let samples = [1.0_f32, -1.0, 0.5, -0.5];
        let (mut left, mut right) = (Vec::new(), Vec::new());
        split_stereo(&AudioBuffer::interleaved(&samples, 2), &mut left, &mut right);
        assert_eq!(left, vec![1.0, 0.5]);
        assert_eq!(right, vec![-1.0, -0.5]);
    }

    #[test]
    fn split_stereo_ignores_extra_channels() {
        let samples = [1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let (mut left, mut right) = (Vec::new(), Vec::new());
        split_stereo(&AudioBuffer::interleaved(&samples, 3), &mut left, &mut right);
        assert_eq!(left, vec![1.0, 4.0]);
        assert_eq!(right, vec![2.0, 5.0]);
    }

    #[test]
    fn split_stereo_without_data_clears_previous_contents() {
        let (mut left, mut right) = (vec![9.0_f32; 4], vec![9.0_f32; 4]);
        split_stereo(&AudioBuffer::without_data(2, 128), &mut left, &mut right);
        assert!(left.is_empty());
        assert!(right.is_empty());
        assert!(left.capacity() >= 4);
    }

    // ---- LinearResampler ---------------------------------------------------

    #[test]
    fn same_rate_is_passthrough() {
        let input: Vec<f32> = (0..441).map(|i| i as f32 / 441.0).collect();
        let mut resampler = LinearResampler::new(44_100, 44_100);
        assert_eq!(run(&mut resampler, &[&input]), input);
    }

    #[test]
    fn empty_input_produces_nothing() {
        let mut resampler = LinearResampler::new(48_000, 44_100);
        assert!(run(&mut resampler, &[&[]]).is_empty());
    }

    #[test]
    fn zero_rate_produces_nothing() {
        let mut resampler = LinearResampler::new(0, 44_100);
        assert!(run(&mut resampler, &[&[0.1, 0.2]]).is_empty());
    }

    #[test]
    fn single_chunk_48k_to_44k() {
        let mut resampler = LinearResampler::new(48_000, 44_100);
        let out = run(&mut resampler, &[&[0.0; 480]]);
        assert_eq!(out.len(), 441);
    }

    #[test]
    fn many_small_chunks_do_not_drift() {
        let chunk = [0.25_f32; 512];
        let chunks = 937;
        let mut resampler = LinearResampler::new(48_000, 44_100);
        let mut out = Vec::new();
        for _ in 0..chunks {
            resampler.process(&chunk, &mut out);
        }

        let expected = (chunks * 512 * 441 / 480) as i64;
        assert!(
            (out.len() as i64 - expected).abs() <= 1,
            "got {} frames, expected {expected}",
            out.len()
        );
        assert_eq!(resampler.produced(), out.len() as u64);
    }

    #[test]
    fn chunked_output_matches_whole_output() {
        let input: Vec<f32> = (0..4_800).map(|i| (i as f32 * 0.01).sin()).collect();

        let whole = run(&mut LinearResampler::new(48_000, 44_100), &[&input]);
        let pieces: Vec<&[f32]> = input.chunks(333).collect();
        let chunked = run(&mut LinearResampler::new(48_000, 44_100), &pieces);

        assert_eq!(whole.len(), chunked.len());
        for (a, b) in whole.iter().zip(&chunked) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn ramp_split_across_chunks_stays_monotonic() {
        let ramp: Vec<f32> = (0..1_024).map(|i| i as f32 / 1_024.0).collect();
        let (first, second) = ramp.split_at(512);

        let out = run(&mut LinearResampler::new(48_000, 44_100), &[first, second]);
        for pair in out.windows(2) {
            assert!(pair[1] > pair[0], "not increasing: {} then {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn upsample_doubles_length() {
        let mut resampler = LinearResampler::new(22_050, 44_100);
        let out = run(&mut resampler, &[&[0.0; 40], &[0.0; 40]]);
        // Every input frame but the last has two outputs.
        assert_eq!(out.len(), 158);
    }

    #[test]
    fn constant_signal_preserves_amplitude() {
        let mut resampler = LinearResampler::new(48_000, 44_100);
        for s in run(&mut resampler, &[&[0.5; 480], &[0.5; 480]]) {
            assert!((s - 0.5).abs() < 1e-5, "amplitude drift: {s}");
        }
    }
}
