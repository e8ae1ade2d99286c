//! Capture controller: owns the lifecycle state machine.
//!
//! [`CaptureController`] ties together an [`InputSource`], a
//! [`PermissionProvider`] and a [`BufferProcessor`].  It lives on the control
//! (UI) thread; the only thing that runs on the audio thread is the handler
//! it installs, which analyses each buffer and hands the resulting
//! [`LevelReading`] back through a bounded channel.
//!
//! # Flow
//!
//! ```text
//! start()
//!   ├─ Granted      → subscribe(handler)            [Capturing]
//!   ├─ Denied       → refuse                        [PermissionDenied]
//!   └─ Undetermined → permission.request()          [PermissionRequested]
//!                        poll() ─ yes → subscribe   [Capturing]
//!                               ─ no  → refuse      [PermissionDenied]
//! stop()
//!   └─ unsubscribe()                                [Idle]
//!
//! audio thread: buffer → processor.process → readings.try_send
//! ```

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::audio::{AudioBuffer, BufferProcessor, CaptureError, InputSource, LevelReading};

use super::permission::{PermissionProvider, PermissionStatus};
use super::state::CaptureState;

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Reasons a capture session could not start.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The user (or the config file) refused microphone access.
    #[error("microphone permission denied")]
    PermissionDenied,

    /// The input device could not be opened or started.
    #[error("failed to start audio engine: {0}")]
    EngineStart(#[source] CaptureError),
}

// ---------------------------------------------------------------------------
// CaptureController
// ---------------------------------------------------------------------------

/// Drives the capture lifecycle.
///
/// ```rust,no_run
/// use mic_detector::audio::{BufferProcessor, CpalInputSource};
/// use mic_detector::pipeline::{CaptureController, PermissionStatus, PromptPermission};
///
/// let (prompt_tx, _prompt_rx) = tokio::sync::mpsc::channel(1);
/// let (reading_tx, mut reading_rx) = tokio::sync::mpsc::channel(64);
///
/// let mut controller = CaptureController::new(
///     CpalInputSource::new(None, None),
///     PromptPermission::new(PermissionStatus::Granted, prompt_tx),
///     BufferProcessor::default(),
///     reading_tx,
/// );
/// controller.start().unwrap();
///
/// while let Some(reading) = reading_rx.blocking_recv() {
///     println!("{}", reading.direction);
/// }
/// ```
pub struct CaptureController<S, P> {
    state: CaptureState,
    source: S,
    permission: P,
    processor: BufferProcessor,
    readings: mpsc::Sender<LevelReading>,
    /// Outstanding permission request, present only in `PermissionRequested`.
    pending: Option<oneshot::Receiver<bool>>,
}

impl<S: InputSource, P: PermissionProvider> CaptureController<S, P> {
    /// Create an idle controller.
    ///
    /// * `source`    : where buffers come from.
    /// * `permission`: microphone access decisions.
    /// * `processor` : per-buffer analysis run on the audio thread.
    /// * `readings`  : receives every reading that passes the volume gate.
    pub fn new(
        source: S,
        permission: P,
        processor: BufferProcessor,
        readings: mpsc::Sender<LevelReading>,
    ) -> Self {
        Self {
            state: CaptureState::Idle,
            source,
            permission,
            processor,
            readings,
            pending: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn permission_status(&self) -> PermissionStatus {
        self.permission.status()
    }

    /// Begin capturing, asking for permission first if needed.
    ///
    /// Starting while already capturing (or while a prompt is pending) is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// [`PipelineError::PermissionDenied`] when access is refused and
    /// [`PipelineError::EngineStart`] when the device fails to start; the
    /// latter leaves the controller `Idle`.
    pub fn start(&mut self) -> Result<CaptureState, PipelineError> {
        match self.state {
            CaptureState::Capturing => {
                log::debug!("capture: already capturing");
                return Ok(self.state);
            }
            CaptureState::PermissionRequested => {
                log::debug!("capture: permission prompt already pending");
                return Ok(self.state);
            }
            CaptureState::PermissionDenied => {
                log::warn!("capture: microphone permission was denied for this session");
                return Err(PipelineError::PermissionDenied);
            }
            CaptureState::Idle => {}
        }

        match self.permission.status() {
            PermissionStatus::Granted => self.begin(),
            PermissionStatus::Denied => self.deny(),
            PermissionStatus::Undetermined => {
                log::info!("capture: Idle → PermissionRequested");
                self.pending = Some(self.permission.request());
                self.state = CaptureState::PermissionRequested;
                Ok(self.state)
            }
        }
    }

    /// Apply the answer to a pending permission request, if one has arrived.
    ///
    /// Call this regularly from the control thread (the UI does it every
    /// frame).  Returns the state after any transition.
    pub fn poll(&mut self) -> Result<CaptureState, PipelineError> {
        let Some(rx) = self.pending.as_mut() else {
            return Ok(self.state);
        };

        let granted = match rx.try_recv() {
            Ok(granted) => granted,
            Err(oneshot::error::TryRecvError::Empty) => return Ok(self.state),
            Err(oneshot::error::TryRecvError::Closed) => false,
        };
        self.pending = None;
        self.permission.resolve(granted);

        if granted {
            self.begin()
        } else {
            self.deny()
        }
    }

    /// Stop capturing.  A pending permission request is abandoned.
    ///
    /// Stopping while not capturing is a no-op.
    pub fn stop(&mut self) -> CaptureState {
        match self.state {
            CaptureState::Capturing => {
                self.source.unsubscribe();
                self.state = CaptureState::Idle;
                log::info!("capture: Capturing → Idle");
            }
            CaptureState::PermissionRequested => {
                self.pending = None;
                self.state = CaptureState::Idle;
                log::info!("capture: permission request abandoned");
            }
            CaptureState::Idle | CaptureState::PermissionDenied => {
                log::debug!("capture: not capturing, nothing to stop");
            }
        }
        self.state
    }

    /// Stop when capturing, start otherwise.
    pub fn toggle(&mut self) -> Result<CaptureState, PipelineError> {
        if self.state.is_capturing() {
            Ok(self.stop())
        } else {
            self.start()
        }
    }

    fn begin(&mut self) -> Result<CaptureState, PipelineError> {
        let processor = self.processor;
        let readings = self.readings.clone();

        let handler = Box::new(move |buffer: &AudioBuffer<'_>| {
            if let Some(reading) = processor.process(buffer) {
                // Never block the audio thread; a full queue drops the reading.
                let _ = readings.try_send(reading);
            }
        });

        match self.source.subscribe(handler) {
            Ok(format) => {
                self.state = CaptureState::Capturing;
                log::info!(
                    "capture: → Capturing ({} Hz, {} ch, threshold {})",
                    format.sample_rate,
                    format.channels,
                    self.processor.threshold()
                );
                Ok(self.state)
            }
            Err(e) => {
                log::error!("Error starting audio engine: {e}");
                self.state = CaptureState::Idle;
                Err(PipelineError::EngineStart(e))
            }
        }
    }

    fn deny(&mut self) -> Result<CaptureState, PipelineError> {
        log::warn!("Permission denied");
        self.state = CaptureState::PermissionDenied;
        Err(PipelineError::PermissionDenied)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::audio::{BufferHandler, Direction, StreamFormat};

    // ---- Fakes -------------------------------------------------------------

    /// Input source that keeps the handler so tests can push buffers by hand.
    #[derive(Default, Clone)]
    struct FakeSource {
        handler: Arc<Mutex<Option<BufferHandler>>>,
        subscribe_calls: Arc<Mutex<usize>>,
        fail_with_no_device: bool,
    }

    impl FakeSource {
        fn push(&self, samples: &[f32], channels: u16) {
            if let Some(handler) = self.handler.lock().unwrap().as_mut() {
                handler(&AudioBuffer::interleaved(samples, channels));
            }
        }

        fn active(&self) -> bool {
            self.handler.lock().unwrap().is_some()
        }
    }

    impl InputSource for FakeSource {
        fn subscribe(&mut self, handler: BufferHandler) -> Result<StreamFormat, CaptureError> {
            *self.subscribe_calls.lock().unwrap() += 1;
            if self.fail_with_no_device {
                return Err(CaptureError::NoDevice);
            }
            let mut slot = self.handler.lock().unwrap();
            if slot.is_some() {
                return Err(CaptureError::AlreadySubscribed);
            }
            *slot = Some(handler);
            Ok(StreamFormat {
                sample_rate: 48_000,
                channels: 2,
            })
        }

        fn unsubscribe(&mut self) {
            self.handler.lock().unwrap().take();
        }

        fn is_subscribed(&self) -> bool {
            self.active()
        }
    }

    /// Permission provider whose answer is delivered by the test.
    struct FakePermission {
        status: PermissionStatus,
        reply: Option<oneshot::Sender<bool>>,
        requests: usize,
    }

    impl FakePermission {
        fn new(status: PermissionStatus) -> Self {
            Self {
                status,
                reply: None,
                requests: 0,
            }
        }
    }

    impl PermissionProvider for FakePermission {
        fn status(&self) -> PermissionStatus {
            self.status
        }

        fn request(&mut self) -> oneshot::Receiver<bool> {
            self.requests += 1;
            let (tx, rx) = oneshot::channel();
            self.reply = Some(tx);
            rx
        }

        fn resolve(&mut self, granted: bool) {
            self.status = if granted {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            };
        }
    }

    type Controller = CaptureController<FakeSource, FakePermission>;

    fn controller(
        status: PermissionStatus,
    ) -> (Controller, FakeSource, mpsc::Receiver<LevelReading>) {
        let source = FakeSource::default();
        let (tx, rx) = mpsc::channel(8);
        let controller = CaptureController::new(
            source.clone(),
            FakePermission::new(status),
            BufferProcessor::default(),
            tx,
        );
        (controller, source, rx)
    }

    fn answer(controller: &mut Controller, granted: bool) {
        let reply = controller.permission.reply.take().expect("pending request");
        reply.send(granted).unwrap();
    }

    // ---- start / stop ------------------------------------------------------

    #[test]
    fn granted_start_captures() {
        let (mut c, source, _rx) = controller(PermissionStatus::Granted);
        assert_eq!(c.start().unwrap(), CaptureState::Capturing);
        assert!(source.active());
    }

    #[test]
    fn start_twice_registers_one_handler() {
        let (mut c, source, _rx) = controller(PermissionStatus::Granted);
        c.start().unwrap();
        assert_eq!(c.start().unwrap(), CaptureState::Capturing);
        assert_eq!(*source.subscribe_calls.lock().unwrap(), 1);
        assert!(source.active());
    }

    #[test]
    fn stop_twice_ends_idle() {
        let (mut c, source, _rx) = controller(PermissionStatus::Granted);
        c.start().unwrap();
        assert_eq!(c.stop(), CaptureState::Idle);
        assert_eq!(c.stop(), CaptureState::Idle);
        assert!(!source.active());
    }

    #[test]
    fn stop_when_idle_is_noop() {
        let (mut c, _source, _rx) = controller(PermissionStatus::Granted);
        assert_eq!(c.stop(), CaptureState::Idle);
    }

    #[test]
    fn restart_after_stop() {
        let (mut c, source, _rx) = controller(PermissionStatus::Granted);
        c.start().unwrap();
        c.stop();
        assert_eq!(c.start().unwrap(), CaptureState::Capturing);
        assert_eq!(*source.subscribe_calls.lock().unwrap(), 2);
    }

    #[test]
    fn toggle_alternates() {
        let (mut c, _source, _rx) = controller(PermissionStatus::Granted);
        assert_eq!(c.toggle().unwrap(), CaptureState::Capturing);
        assert_eq!(c.toggle().unwrap(), CaptureState::Idle);
    }

    #[test]
    fn engine_failure_returns_to_idle() {
        let source = FakeSource {
            fail_with_no_device: true,
            ..FakeSource::default()
        };
        let (tx, _rx) = mpsc::channel(1);
        let mut c = CaptureController::new(
            source,
            FakePermission::new(PermissionStatus::Granted),
            BufferProcessor::default(),
            tx,
        );

        let err = c.start().unwrap_err();
        assert!(matches!(err, PipelineError::EngineStart(CaptureError::NoDevice)));
        assert_eq!(c.state(), CaptureState::Idle);
    }

    // ---- permission --------------------------------------------------------

    #[test]
    fn denied_start_is_refused() {
        let (mut c, source, _rx) = controller(PermissionStatus::Denied);
        assert!(matches!(c.start(), Err(PipelineError::PermissionDenied)));
        assert_eq!(c.state(), CaptureState::PermissionDenied);
        assert!(!source.active());
    }

    #[test]
    fn undetermined_prompts_then_captures_on_grant() {
        let (mut c, source, _rx) = controller(PermissionStatus::Undetermined);
        assert_eq!(c.start().unwrap(), CaptureState::PermissionRequested);
        assert!(!source.active());

        // Nothing answered yet.
        assert_eq!(c.poll().unwrap(), CaptureState::PermissionRequested);

        answer(&mut c, true);
        assert_eq!(c.poll().unwrap(), CaptureState::Capturing);
        assert!(source.active());
        assert_eq!(c.permission_status(), PermissionStatus::Granted);
    }

    #[test]
    fn undetermined_denied_is_terminal() {
        let (mut c, source, _rx) = controller(PermissionStatus::Undetermined);
        c.start().unwrap();
        answer(&mut c, false);

        assert!(matches!(c.poll(), Err(PipelineError::PermissionDenied)));
        assert_eq!(c.state(), CaptureState::PermissionDenied);

        // No silent retry: start refuses without prompting again.
        assert!(matches!(c.start(), Err(PipelineError::PermissionDenied)));
        assert_eq!(c.permission.requests, 1);
        assert!(!source.active());
    }

    #[test]
    fn dropped_prompt_counts_as_denial() {
        let (mut c, _source, _rx) = controller(PermissionStatus::Undetermined);
        c.start().unwrap();
        drop(c.permission.reply.take());

        assert!(matches!(c.poll(), Err(PipelineError::PermissionDenied)));
    }

    #[test]
    fn start_while_prompt_pending_does_not_prompt_again() {
        let (mut c, _source, _rx) = controller(PermissionStatus::Undetermined);
        c.start().unwrap();
        c.start().unwrap();
        assert_eq!(c.permission.requests, 1);
    }

    #[test]
    fn stop_abandons_pending_prompt() {
        let (mut c, _source, _rx) = controller(PermissionStatus::Undetermined);
        c.start().unwrap();
        assert_eq!(c.stop(), CaptureState::Idle);
        assert_eq!(c.poll().unwrap(), CaptureState::Idle);
    }

    // ---- readings ----------------------------------------------------------

    #[test]
    fn loud_buffer_produces_reading() {
        let (mut c, source, mut rx) = controller(PermissionStatus::Granted);
        c.start().unwrap();

        let samples: Vec<f32> = (0..512).flat_map(|_| [0.2_f32, 0.8]).collect();
        source.push(&samples, 2);

        let reading = rx.try_recv().expect("reading");
        assert_eq!(reading.direction, Direction::Right);
        assert!((reading.rms.left - 0.2).abs() < 1e-6);
        assert!((reading.rms.right - 0.8).abs() < 1e-6);
    }

    #[test]
    fn quiet_buffer_produces_nothing() {
        let (mut c, source, mut rx) = controller(PermissionStatus::Granted);
        c.start().unwrap();

        source.push(&[0.001_f32; 1024], 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_channel_drops_readings() {
        let (mut c, source, mut rx) = controller(PermissionStatus::Granted);
        c.start().unwrap();

        let samples = vec![0.5_f32; 256];
        for _ in 0..20 {
            source.push(&samples, 1);
        }

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 8);
    }

    #[test]
    fn no_readings_after_stop() {
        let (mut c, source, mut rx) = controller(PermissionStatus::Granted);
        c.start().unwrap();
        c.stop();

        source.push(&[0.5_f32; 256], 1);
        assert!(rx.try_recv().is_err());
    }
}
