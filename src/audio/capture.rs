//! Microphone input via `cpal`.
//!
//! [`InputSource`] is the seam between the device layer and everything that
//! consumes audio: a consumer registers one [`BufferHandler`] with
//! [`InputSource::subscribe`] and the source calls it once per hardware
//! buffer until [`InputSource::unsubscribe`].
//!
//! [`CpalInputSource`] is the real implementation.  The device is opened in
//! `subscribe`, not in the constructor, so a missing microphone surfaces as a
//! start failure that the caller can report and recover from.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::buffer::AudioBuffer;

// ---------------------------------------------------------------------------
// BufferHandler / StreamFormat
// ---------------------------------------------------------------------------

/// Callback invoked once per incoming buffer on the audio thread.
///
/// The buffer is only borrowed for the duration of the call.  Handlers must
/// not block: no locks, no I/O.
pub type BufferHandler = Box<dyn FnMut(&AudioBuffer<'_>) + Send + 'static>;

/// Format negotiated with the device when a stream is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Samples per second per channel (e.g. 44100, 48000).
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening or starting an input stream.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device '{0}' not found")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported input sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("a handler is already subscribed to this input source")]
    AlreadySubscribed,
}

// ---------------------------------------------------------------------------
// InputSource
// ---------------------------------------------------------------------------

/// Something that delivers audio buffers to a single registered handler.
pub trait InputSource {
    /// Register `handler` and start delivering buffers to it.
    ///
    /// # Errors
    ///
    /// Fails if the device cannot be opened or started, or if a handler is
    /// already registered.
    fn subscribe(&mut self, handler: BufferHandler) -> Result<StreamFormat, CaptureError>;

    /// Stop delivering buffers and drop the handler.  Buffers already being
    /// processed finish normally.  Does nothing when no handler is registered.
    fn unsubscribe(&mut self);

    /// `true` while a handler is registered.
    fn is_subscribed(&self) -> bool;
}

// ---------------------------------------------------------------------------
// CpalInputSource
// ---------------------------------------------------------------------------

/// [`InputSource`] backed by a `cpal` input stream.
///
/// # Example
///
/// ```rust,no_run
/// use mic_detector::audio::{calculate_rms, CpalInputSource, InputSource};
///
/// let mut source = CpalInputSource::new(None, None);
/// let format = source
///     .subscribe(Box::new(|buffer| {
///         if let Some(rms) = calculate_rms(buffer) {
///             println!("L {:.3} R {:.3}", rms.left, rms.right);
///         }
///     }))
///     .unwrap();
/// println!("{} Hz, {} ch", format.sample_rate, format.channels);
/// // Dropping `source` (or calling `unsubscribe`) stops the stream.
/// ```
pub struct CpalInputSource {
    /// Input device name; `None` selects the host default.
    device_name: Option<String>,
    /// Fixed buffer size in frames; `None` lets the host decide.
    buffer_frames: Option<u32>,
    /// Live stream.  Dropping it stops the hardware stream.
    stream: Option<cpal::Stream>,
}

impl CpalInputSource {
    pub fn new(device_name: Option<String>, buffer_frames: Option<u32>) -> Self {
        Self {
            device_name,
            buffer_frames,
            stream: None,
        }
    }

    fn open_device(&self) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        match &self.device_name {
            None => host.default_input_device().ok_or(CaptureError::NoDevice),
            Some(name) => host
                .input_devices()?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| CaptureError::DeviceNotFound(name.clone())),
        }
    }
}

impl InputSource for CpalInputSource {
    fn subscribe(&mut self, mut handler: BufferHandler) -> Result<StreamFormat, CaptureError> {
        if self.stream.is_some() {
            return Err(CaptureError::AlreadySubscribed);
        }

        let device = self.open_device()?;
        let supported = device.default_input_config()?;
        let sample_format = supported.sample_format();

        let format = StreamFormat {
            sample_rate: supported.sample_rate().0,
            channels: supported.channels(),
        };
        let mut config: cpal::StreamConfig = supported.into();
        if let Some(frames) = self.buffer_frames {
            config.buffer_size = cpal::BufferSize::Fixed(frames);
        }

        let channels = format.channels;
        let on_error = |err: cpal::StreamError| {
            log::error!("cpal stream error: {err}");
        };

        let stream = match sample_format {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    handler(&AudioBuffer::interleaved(data, channels));
                },
                on_error,
                None,
            )?,
            cpal::SampleFormat::I16 => {
                // Converted samples live here; capacity is reused across callbacks.
                let mut scratch: Vec<f32> = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        scratch.clear();
                        scratch.extend(data.iter().map(|&s| f32::from(s) / 32_768.0));
                        handler(&AudioBuffer::interleaved(&scratch, channels));
                    },
                    on_error,
                    None,
                )?
            }
            other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
        };

        stream.play()?;
        log::info!(
            "input stream started ({} Hz, {} ch, {:?})",
            format.sample_rate,
            format.channels,
            sample_format
        );

        self.stream = Some(stream);
        Ok(format)
    }

    fn unsubscribe(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("pausing input stream failed: {e}");
            }
            log::info!("input stream stopped");
        }
    }

    fn is_subscribed(&self) -> bool {
        self.stream.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
