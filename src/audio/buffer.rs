//! Borrowed view over one callback's worth of PCM audio.
//!
//! [`AudioBuffer`] never owns its samples.  The input source builds one per
//! callback over the slice it was handed, passes it to the registered handler
//! and drops it when the callback returns, so nothing here allocates.
//!
//! Two sample layouts are supported:
//!
//! * **Interleaved**: one slice, channels alternating (`L R L R …`).  This is
//!   what `cpal` delivers.
//! * **Planar**: one slice per channel.
//!
//! # Example
//!
//! ```rust
//! use mic_detector::audio::AudioBuffer;
//!
//! let interleaved = [0.5_f32, -0.25, 0.5, -0.25]; // L R L R
//! let buffer = AudioBuffer::interleaved(&interleaved, 2);
//! assert_eq!(buffer.frame_length(), 2);
//!
//! let right: Vec<f32> = buffer.channel(1).unwrap().iter().collect();
//! assert_eq!(right, vec![-0.25, -0.25]);
//! ```

// ---------------------------------------------------------------------------
// ChannelData
// ---------------------------------------------------------------------------

/// The two sample layouts an [`AudioBuffer`] can wrap.
#[derive(Debug, Clone, Copy)]
pub enum ChannelData<'a> {
    /// Channels alternate sample by sample.
    Interleaved(&'a [f32]),
    /// One slice per channel.
    Planar(&'a [&'a [f32]]),
}

// ---------------------------------------------------------------------------
// AudioBuffer
// ---------------------------------------------------------------------------

/// One buffer of `f32` PCM as delivered by an input source.
///
/// `frame_length` counts frames (one sample per channel), not raw samples.
/// A buffer may carry no channel data at all; analysis treats such a buffer
/// as silent instead of failing.
#[derive(Debug, Clone, Copy)]
pub struct AudioBuffer<'a> {
    data: Option<ChannelData<'a>>,
    channel_count: u16,
    frame_length: usize,
}

impl<'a> AudioBuffer<'a> {
    /// Wrap interleaved samples.
    ///
    /// Any trailing partial frame is ignored.  A `channel_count` of `0`
    /// produces a buffer without channel data.
    pub fn interleaved(samples: &'a [f32], channel_count: u16) -> Self {
        if channel_count == 0 {
            return Self::without_data(0, 0);
        }
        Self {
            data: Some(ChannelData::Interleaved(samples)),
            channel_count,
            frame_length: samples.len() / channel_count as usize,
        }
    }

    /// Wrap planar channel slices.
    ///
    /// The frame length is the length of the shortest channel.
    pub fn planar(channels: &'a [&'a [f32]]) -> Self {
        if channels.is_empty() {
            return Self::without_data(0, 0);
        }
        let frame_length = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        Self {
            data: Some(ChannelData::Planar(channels)),
            channel_count: channels.len().min(u16::MAX as usize) as u16,
            frame_length,
        }
    }

    /// A buffer that reports a format but whose sample data is unavailable.
    pub fn without_data(channel_count: u16, frame_length: usize) -> Self {
        Self {
            data: None,
            channel_count,
            frame_length,
        }
    }

    /// Number of channels (1 = mono, 2 = stereo, …).
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Number of frames in this buffer.
    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    /// `false` when the source could not provide sample data.
    pub fn has_channel_data(&self) -> bool {
        self.data.is_some()
    }

    /// Samples of channel `index`, or `None` if the channel does not exist or
    /// there is no sample data.
    pub fn channel(&self, index: usize) -> Option<ChannelSamples<'a>> {
        if index >= self.channel_count as usize {
            return None;
        }
        match self.data? {
            ChannelData::Interleaved(samples) => Some(ChannelSamples {
                samples,
                offset: index,
                stride: self.channel_count as usize,
                len: self.frame_length,
            }),
            ChannelData::Planar(channels) => Some(ChannelSamples {
                samples: *channels.get(index)?,
                offset: 0,
                stride: 1,
                len: self.frame_length,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelSamples
// ---------------------------------------------------------------------------

/// Strided view of a single channel inside an [`AudioBuffer`].
#[derive(Debug, Clone, Copy)]
pub struct ChannelSamples<'a> {
    samples: &'a [f32],
    offset: usize,
    /// Always `>= 1`.
    stride: usize,
    len: usize,
}

impl<'a> ChannelSamples<'a> {
    /// Number of frames in the channel.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate the channel's samples in frame order.
    pub fn iter(&self) -> impl Iterator<Item = f32> + 'a {
        let tail: &'a [f32] = self.samples.get(self.offset..).unwrap_or(&[]);
        tail.iter().step_by(self.stride).take(self.len).copied()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_frame_length_counts_frames() {
        let samples = [0.0_f32; 10];
        let buffer = AudioBuffer::interleaved(&samples, 2);
        assert_eq!(buffer.frame_length(), 5);
        assert_eq!(buffer.channel_count(), 2);
        assert!(buffer.has_channel_data());
    }

    #[test]
    fn interleaved_ignores_partial_trailing_frame() {
        let samples = [1.0_f32, 2.0, 3.0];
        let buffer = AudioBuffer::interleaved(&samples, 2);
        assert_eq!(buffer.frame_length(), 1);
        let right: Vec<f32> = buffer.channel(1).unwrap().iter().collect();
        assert_eq!(right, vec![2.0]);
    }

    #[test]
    fn interleaved_channels_are_deinterleaved() {
        let samples = [1.0_f32, 10.0, 2.0, 20.0, 3.0, 30.0];
        let buffer = AudioBuffer::interleaved(&samples, 2);

        let left: Vec<f32> = buffer.channel(0).unwrap().iter().collect();
        let right: Vec<f32> = buffer.channel(1).unwrap().iter().collect();
        assert_eq!(left, vec![1.0, 2.0, 3.0]);
        assert_eq!(right, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn zero_channels_has_no_data() {
        let buffer = AudioBuffer::interleaved(&[1.0, 2.0], 0);
        assert!(!buffer.has_channel_data());
        assert_eq!(buffer.frame_length(), 0);
        assert!(buffer.channel(0).is_none());
    }

    #[test]
    fn planar_uses_shortest_channel() {
        let left = [1.0_f32, 2.0, 3.0];
        let right = [4.0_f32, 5.0];
        let channels: [&[f32]; 2] = [&left, &right];
        let buffer = AudioBuffer::planar(&channels);

        assert_eq!(buffer.frame_length(), 2);
        let left: Vec<f32> = buffer.channel(0).unwrap().iter().collect();
        assert_eq!(left, vec![1.0, 2.0]);
    }

    #[test]
    fn channel_out_of_range_is_none() {
        let samples = [0.0_f32; 4];
        let buffer = AudioBuffer::interleaved(&samples, 1);
        assert!(buffer.channel(1).is_none());
    }

    #[test]
    fn without_data_reports_format_only() {
        let buffer = AudioBuffer::without_data(2, 512);
        assert_eq!(buffer.frame_length(), 512);
        assert!(buffer.channel(0).is_none());
    }

    #[test]
    fn iter_respects_stride_and_length() {
        let samples = [1.0_f32, 10.0, 2.0, 20.0];
        let channel = AudioBuffer::interleaved(&samples, 2).channel(1).unwrap();
        assert_eq!(channel.iter().collect::<Vec<_>>(), vec![10.0, 20.0]);
        assert_eq!(channel.len(), 2);
    }

    #[test]
    fn empty_interleaved_channel_iterates_nothing() {
        let buffer = AudioBuffer::interleaved(&[], 2);
        let channel = buffer.channel(1).unwrap();
        assert!(channel.is_empty());
        assert_eq!(channel.iter().count(), 0);
    }
}
