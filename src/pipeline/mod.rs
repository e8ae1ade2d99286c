//! Capture lifecycle: permission, start/stop, and hand-off of readings.
//!
//! # Architecture
//!
//! ```text
//! UI thread                               audio thread
//! ─────────                               ────────────
//! CaptureController::start()
//!   ├─ PermissionProvider::status()
//!   ├─ PermissionProvider::request() ──▶ PermissionPrompt (UI dialog)
//!   └─ InputSource::subscribe(handler) ─▶ handler(&AudioBuffer)
//!                                           └─ BufferProcessor::process
//! LevelReading (mpsc) ◀──────────────────────┘ try_send
//! ```
//!
//! The controller is the only owner of [`CaptureState`]; the audio thread
//! never reads or writes it.

pub mod controller;
pub mod permission;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{CaptureController, PipelineError};
pub use permission::{
    PermissionError, PermissionPrompt, PermissionProvider, PermissionStatus, PromptPermission,
};
pub use state::CaptureState;
