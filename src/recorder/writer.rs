//! File recorder.
//!
//! [`AudioRecorder`] subscribes to its own [`InputSource`] and streams what it
//! hears to a raw PCM file in [`RECORDING_FORMAT`].  The audio callback only
//! copies left/right into a recycled [`StereoChunk`] and hands it to a bounded
//! queue; the `pcm-writer` thread resamples, encodes and writes, then returns
//! the chunk for reuse.
//!
//! ```text
//! prepare(path) ─▶ Ready ─ start() ─▶ Recording ─ stop() ─▶ Unprepared
//!     │ I/O error                         │          └─▶ FinishedRecording
//!     └─▶ Unprepared                      └─ write error ─▶ take_writer_error()
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;

use crate::audio::{split_stereo, AudioBuffer, CaptureError, InputSource, LinearResampler};

use super::format::{encode_stereo, RECORDING_FORMAT};

/// How often the writer thread checks the stop flag while idle.
const WRITER_POLL: Duration = Duration::from_millis(50);

/// Chunks the audio callback may queue ahead of the writer.
const DEFAULT_QUEUE_CHUNKS: usize = 64;

// ---------------------------------------------------------------------------
// RecorderError
// ---------------------------------------------------------------------------

/// Errors from recorder setup, recording and offline analysis.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("recording file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("recorder is not prepared")]
    NotPrepared,

    #[error("recorder is already recording")]
    AlreadyRecording,

    #[error("recorder is not recording")]
    NotRecording,

    #[error("failed to open recording input: {0}")]
    Capture(#[from] CaptureError),

    #[error("recording writer thread panicked")]
    WriterPanicked,
}

// ---------------------------------------------------------------------------
// RecorderState / FinishedRecording
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    /// No usable output file.  [`AudioRecorder::prepare`] must succeed first.
    #[default]
    Unprepared,
    /// Output file created, not recording yet.
    Ready,
    Recording,
}

/// What [`AudioRecorder::stop`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedRecording {
    pub path: PathBuf,
    /// Stereo frames written at [`RECORDING_FORMAT`]'s sample rate.
    pub frames: u64,
    /// Callback buffers lost because the writer fell behind.
    pub dropped_chunks: u64,
}

// ---------------------------------------------------------------------------
// StereoChunk / ChunkSender
// ---------------------------------------------------------------------------

/// Left/right samples of one callback buffer at the device sample rate.
#[derive(Debug, Default)]
struct StereoChunk {
    left: Vec<f32>,
    right: Vec<f32>,
}

/// Audio-thread end of the writer queue.
///
/// Never blocks: chunks come from the recycle channel when one is free, and a
/// full queue drops the buffer and counts it.
struct ChunkSender {
    queue: mpsc::SyncSender<StereoChunk>,
    recycled: mpsc::Receiver<StereoChunk>,
    dropped: Arc<AtomicU64>,
}

impl ChunkSender {
    fn send(&mut self, buffer: &AudioBuffer<'_>) {
        let mut chunk = self.recycled.try_recv().unwrap_or_default();
        split_stereo(buffer, &mut chunk.left, &mut chunk.right);
        if chunk.left.is_empty() {
            return;
        }

        match self.queue.try_send(chunk) {
            Ok(()) => {}
            Err(mpsc::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            // Writer already gone; `take_writer_error` or `stop` reports why.
            Err(mpsc::TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Build both ends of a writer queue holding at most `capacity` chunks.
fn chunk_queue(
    capacity: usize,
    dropped: Arc<AtomicU64>,
) -> (
    ChunkSender,
    mpsc::Receiver<StereoChunk>,
    mpsc::SyncSender<StereoChunk>,
) {
    let (queue, rx) = mpsc::sync_channel(capacity);
    let (recycle, recycled) = mpsc::sync_channel(capacity);
    (
        ChunkSender {
            queue,
            recycled,
            dropped,
        },
        rx,
        recycle,
    )
}

// ---------------------------------------------------------------------------
// AudioRecorder
// ---------------------------------------------------------------------------

/// Records an [`InputSource`] to a raw PCM file.
pub struct AudioRecorder<S> {
    source: S,
    state: RecorderState,
    path: Option<PathBuf>,
    file: Option<File>,
    writer: Option<JoinHandle<io::Result<u64>>>,
    stop_flag: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    queue_chunks: usize,
}

impl<S: InputSource> AudioRecorder<S> {
    pub fn new(source: S) -> Self {
        Self::with_queue_capacity(source, DEFAULT_QUEUE_CHUNKS)
    }

    /// Like [`new`](Self::new) with room for `chunks` callback buffers
    /// between the audio thread and the writer (at least one).
    pub fn with_queue_capacity(source: S, chunks: usize) -> Self {
        Self {
            source,
            state: RecorderState::Unprepared,
            path: None,
            file: None,
            writer: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
            queue_chunks: chunks.max(1),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Output path of the prepared or running recording.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create (or truncate) the output file at `path`, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// [`RecorderError::Io`] leaves the recorder `Unprepared` until a later
    /// `prepare` succeeds.
    pub fn prepare(&mut self, path: impl Into<PathBuf>) -> Result<(), RecorderError> {
        if self.is_recording() {
            return Err(RecorderError::AlreadyRecording);
        }

        let path = path.into();
        self.state = RecorderState::Unprepared;
        self.file = None;
        self.path = None;

        let file = create_output(&path).inspect_err(|e| {
            log::error!("Failed to set up the recorder at {}: {e}", path.display());
        })?;

        log::info!("recorder: ready to record to {}", path.display());
        self.file = Some(file);
        self.path = Some(path);
        self.state = RecorderState::Ready;
        Ok(())
    }

    /// Start recording into the prepared file.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        match self.state {
            RecorderState::Recording => return Err(RecorderError::AlreadyRecording),
            RecorderState::Unprepared => return Err(RecorderError::NotPrepared),
            RecorderState::Ready => {}
        }
        let file = self.file.take().ok_or(RecorderError::NotPrepared)?;

        self.dropped = Arc::new(AtomicU64::new(0));
        let (mut sender, rx, recycle) = chunk_queue(self.queue_chunks, Arc::clone(&self.dropped));
        let handler = Box::new(move |buffer: &AudioBuffer<'_>| sender.send(buffer));

        let format = match self.source.subscribe(handler) {
            Ok(format) => format,
            Err(e) => {
                self.file = Some(file);
                return Err(e.into());
            }
        };

        self.stop_flag = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&self.stop_flag);
        let spawned = std::thread::Builder::new()
            .name("pcm-writer".into())
            .spawn(move || write_chunks(file, rx, recycle, format.sample_rate, &stop_flag));

        match spawned {
            Ok(handle) => {
                self.writer = Some(handle);
                self.state = RecorderState::Recording;
                log::info!(
                    "recorder: recording from {} Hz / {} ch input",
                    format.sample_rate,
                    format.channels
                );
                Ok(())
            }
            Err(e) => {
                self.source.unsubscribe();
                self.state = RecorderState::Unprepared;
                Err(e.into())
            }
        }
    }

    /// Stop recording, flush the file and return what was written.
    ///
    /// The recorder is `Unprepared` afterwards; call [`prepare`](Self::prepare)
    /// before recording again.
    pub fn stop(&mut self) -> Result<FinishedRecording, RecorderError> {
        if self.state != RecorderState::Recording {
            return Err(RecorderError::NotRecording);
        }

        self.source.unsubscribe();
        self.stop_flag.store(true, Ordering::Release);
        self.state = RecorderState::Unprepared;

        let writer = self.writer.take().ok_or(RecorderError::NotRecording)?;
        let path = self.path.take().ok_or(RecorderError::NotPrepared)?;
        let frames = writer.join().map_err(|_| RecorderError::WriterPanicked)??;

        let dropped_chunks = self.dropped.load(Ordering::Relaxed);
        if dropped_chunks > 0 {
            log::warn!("recorder: writer fell behind, {dropped_chunks} buffers dropped");
        }
        log::info!("recorder: wrote {frames} frames to {}", path.display());
        Ok(FinishedRecording {
            path,
            frames,
            dropped_chunks,
        })
    }

    /// Check whether the writer thread died while recording.
    ///
    /// Call this regularly (the UI does it every frame).  When the writer has
    /// exited on its own, the recording is ended and its error returned;
    /// otherwise returns `None`.
    pub fn take_writer_error(&mut self) -> Option<RecorderError> {
        if self.state != RecorderState::Recording {
            return None;
        }
        if !self.writer.as_ref().is_some_and(|w| w.is_finished()) {
            return None;
        }

        match self.stop() {
            Ok(finished) => {
                log::warn!(
                    "recorder: writer exited early after {} frames",
                    finished.frames
                );
                None
            }
            Err(e) => {
                log::error!("recorder: {e}");
                Some(e)
            }
        }
    }
}

fn create_output(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    File::create(path)
}

/// Writer thread body.  Runs until the sender is dropped or `stop` is set,
/// then drains whatever is still queued.
///
/// One resampler per channel lives for the whole recording so chunk
/// boundaries interpolate into each other.
fn write_chunks(
    file: File,
    rx: mpsc::Receiver<StereoChunk>,
    recycle: mpsc::SyncSender<StereoChunk>,
    source_rate: u32,
    stop: &AtomicBool,
) -> io::Result<u64> {
    let mut out = BufWriter::new(file);
    let mut left_rs = LinearResampler::new(source_rate, RECORDING_FORMAT.sample_rate);
    let mut right_rs = LinearResampler::new(source_rate, RECORDING_FORMAT.sample_rate);
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut bytes = Vec::new();
    let mut frames = 0u64;

    let mut write = |chunk: StereoChunk| -> io::Result<()> {
        left.clear();
        right.clear();
        left_rs.process(&chunk.left, &mut left);
        right_rs.process(&chunk.right, &mut right);
        // Full or disconnected recycle queue just frees the chunk.
        let _ = recycle.try_send(chunk);

        bytes.clear();
        encode_stereo(&left, &right, &mut bytes);
        out.write_all(&bytes)?;
        frames += left.len().min(right.len()) as u64;
        Ok(())
    };

    loop {
        match rx.recv_timeout(WRITER_POLL) {
            Ok(chunk) => write(chunk)?,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if stop.load(Ordering::Acquire) {
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    while let Ok(chunk) = rx.try_recv() {
        write(chunk)?;
    }

    out.flush()?;
    Ok(frames)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
