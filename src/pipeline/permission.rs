//! Microphone permission.
//!
//! Desktop platforms have no system-wide microphone permission that `cpal`
//! can query, so access is a user decision stored in the config file:
//!
//! | `microphone_access` | [`PermissionStatus`] | Effect on start |
//! |---------------------|----------------------|-----------------|
//! | `"granted"` | `Granted` | capture starts immediately |
//! | `"denied"` | `Denied` | start is refused |
//! | `"ask"` / `"undetermined"` | `Undetermined` | the UI is asked via a [`PermissionPrompt`] |
//!
//! Any other value is rejected with [`PermissionError::Unknown`].

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

// ---------------------------------------------------------------------------
// PermissionStatus
// ---------------------------------------------------------------------------

/// Current microphone access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Raised for a permission value that is none of the known states.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PermissionError {
    #[error("unknown microphone permission state '{0}' (expected granted, denied or ask)")]
    Unknown(String),
}

impl FromStr for PermissionStatus {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "granted" => Ok(PermissionStatus::Granted),
            "denied" => Ok(PermissionStatus::Denied),
            "ask" | "undetermined" => Ok(PermissionStatus::Undetermined),
            _ => Err(PermissionError::Unknown(s.to_string())),
        }
    }
}

impl PermissionStatus {
    /// Value written back to `settings.toml`.
    pub fn as_config_str(&self) -> &'static str {
        match self {
            PermissionStatus::Granted => "granted",
            PermissionStatus::Denied => "denied",
            PermissionStatus::Undetermined => "ask",
        }
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_config_str())
    }
}

// ---------------------------------------------------------------------------
// PermissionProvider
// ---------------------------------------------------------------------------

/// Source of microphone access decisions.
pub trait PermissionProvider {
    fn status(&self) -> PermissionStatus;

    /// Ask the user.  The answer arrives later on the returned receiver;
    /// a dropped sender counts as a denial.
    fn request(&mut self) -> oneshot::Receiver<bool>;

    /// Record the outcome of a [`request`](Self::request).
    fn resolve(&mut self, granted: bool);
}

// ---------------------------------------------------------------------------
// PermissionPrompt / PromptPermission
// ---------------------------------------------------------------------------

/// A pending question for the user.  Answer it exactly once.
#[derive(Debug)]
pub struct PermissionPrompt {
    reply: oneshot::Sender<bool>,
}

impl PermissionPrompt {
    pub fn answer(self, granted: bool) {
        // The requester may have given up after capture stopped.
        let _ = self.reply.send(granted);
    }
}

/// [`PermissionProvider`] that forwards requests to the UI over a channel.
pub struct PromptPermission {
    status: PermissionStatus,
    prompts: mpsc::Sender<PermissionPrompt>,
}

impl PromptPermission {
    /// Create a provider starting at `status` that sends prompts to `prompts`.
    pub fn new(status: PermissionStatus, prompts: mpsc::Sender<PermissionPrompt>) -> Self {
        Self { status, prompts }
    }
}

impl PermissionProvider for PromptPermission {
    fn status(&self) -> PermissionStatus {
        self.status
    }

    fn request(&mut self) -> oneshot::Receiver<bool> {
        let (reply, rx) = oneshot::channel();
        if let Err(e) = self.prompts.try_send(PermissionPrompt { reply }) {
            // The prompt (and its sender) is dropped here, so `rx` resolves
            // as closed and the controller treats it as a denial.
            log::warn!("could not deliver microphone permission prompt: {e}");
        }
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_states() {
        assert_eq!("granted".parse(), Ok(PermissionStatus::Granted));
        assert_eq!("Denied".parse(), Ok(PermissionStatus::Denied));
        assert_eq!("ask".parse(), Ok(PermissionStatus::Undetermined));
        assert_eq!(" undetermined ".parse(), Ok(PermissionStatus::Undetermined));
    }

    #[test]
    fn parse_unknown_state_fails() {
        let err = "maybe".parse::<PermissionStatus>().unwrap_err();
        assert_eq!(err, PermissionError::Unknown("maybe".into()));
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn config_str_round_trips() {
        for status in [
            PermissionStatus::Granted,
            PermissionStatus::Denied,
            PermissionStatus::Undetermined,
        ] {
            assert_eq!(status.as_config_str().parse(), Ok(status));
        }
    }

    #[test]
    fn prompt_answer_reaches_requester() {
        let (tx, mut prompts) = mpsc::channel(1);
        let mut provider = PromptPermission::new(PermissionStatus::Undetermined, tx);

        let mut rx = provider.request();
        let prompt = prompts.try_recv().expect("prompt delivered");
        prompt.answer(true);

        assert_eq!(rx.try_recv(), Ok(true));
    }

    #[test]
    fn undeliverable_prompt_closes_receiver() {
        let (tx, prompts) = mpsc::channel(1);
        drop(prompts);
        let mut provider = PromptPermission::new(PermissionStatus::Undetermined, tx);

        let mut rx = provider.request();
        assert_eq!(rx.try_recv(), Err(oneshot::error::TryRecvError::Closed));
    }

    #[test]
    fn resolve_updates_status() {
        let (tx, _prompts) = mpsc::channel(1);
        let mut provider = PromptPermission::new(PermissionStatus::Undetermined, tx);

        provider.resolve(false);
        assert_eq!(provider.status(), PermissionStatus::Denied);
        provider.resolve(true);
        assert_eq!(provider.status(), PermissionStatus::Granted);
    }
}
