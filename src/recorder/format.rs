//! Raw PCM file format used for recordings.
//!
//! Headerless, interleaved, 16-bit signed little-endian, 44 100 Hz stereo.
//! A file is nothing but `L R L R …` sample pairs, two bytes each.

/// Layout of a headerless PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl PcmFormat {
    /// Bytes occupied by one frame (one sample per channel).
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }
}

/// The format every recording is written in.
pub const RECORDING_FORMAT: PcmFormat = PcmFormat {
    sample_rate: 44_100,
    channels: 2,
    bits_per_sample: 16,
};

/// Convert one `f32` sample in `[-1.0, 1.0]` to little-endian `i16` bytes.
///
/// Out-of-range input is clamped.
pub fn encode_sample(sample: f32) -> [u8; 2] {
    let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
    value.to_le_bytes()
}

/// Append interleaved stereo frames built from `left` and `right` to `out`.
///
/// Only `min(left.len(), right.len())` frames are written.
pub fn encode_stereo(left: &[f32], right: &[f32], out: &mut Vec<u8>) {
    out.reserve(left.len().min(right.len()) * RECORDING_FORMAT.bytes_per_frame());
    for (&l, &r) in left.iter().zip(right) {
        out.extend_from_slice(&encode_sample(l));
        out.extend_from_slice(&encode_sample(r));
    }
}

/// Decode little-endian `i16` samples to `f32`.  A trailing odd byte is
/// ignored.
pub fn decode_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32_768.0)
        .collect()
}
