//! Capture lifecycle state.
//!
//! [`CaptureState`] is the single authoritative answer to "is the microphone
//! running?".  It is owned by [`CaptureController`](super::CaptureController)
//! and only changed from the control thread.

// ---------------------------------------------------------------------------
// CaptureState
// ---------------------------------------------------------------------------

/// States of the capture lifecycle.
///
/// ```text
/// Idle ──start (granted)────────────▶ Capturing
///      ──start (undetermined)───────▶ PermissionRequested
///                                        ──grant──▶ Capturing
///                                        ──deny───▶ PermissionDenied
///                                        ──stop───▶ Idle
/// Idle ──start (denied)─────────────▶ PermissionDenied
/// Capturing ──stop──────────────────▶ Idle
/// Capturing ──engine start failure──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    /// No handler registered, no stream running.
    #[default]
    Idle,

    /// Waiting for the user to answer the microphone permission prompt.
    PermissionRequested,

    /// Access was refused.  Terminal for this session: further starts are
    /// refused without prompting again.
    PermissionDenied,

    /// A handler is installed and buffers are being analysed.
    Capturing,
}

impl CaptureState {
    /// `true` only while buffers are flowing.
    ///
    /// ```
    /// use mic_detector::pipeline::CaptureState;
    ///
    /// assert!(CaptureState::Capturing.is_capturing());
    /// assert!(!CaptureState::Idle.is_capturing());
    /// assert!(!CaptureState::PermissionRequested.is_capturing());
    /// assert!(!CaptureState::PermissionDenied.is_capturing());
    /// ```
    pub fn is_capturing(&self) -> bool {
        matches!(self, CaptureState::Capturing)
    }

    /// Status line shown in the UI.
    pub fn label(&self) -> &'static str {
        match self {
            CaptureState::Idle => "Not Streaming",
            CaptureState::PermissionRequested => "Waiting for microphone access...",
            CaptureState::PermissionDenied => "Microphone access denied",
            CaptureState::Capturing => "Streaming...",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
