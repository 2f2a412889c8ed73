//! Core types for speech recognition

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recognizer lifecycle event types
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// A recognition session became live
    Started { session_id: u64 },
    /// A transcript, partial or finalized
    Transcript(Transcript),
    /// An error inside the session
    Error(RecognizerError),
    /// The session terminated. Emitted exactly once per started session,
    /// for explicit stops, natural ends, and error teardowns alike.
    Ended { session_id: u64 },
}

/// A single recognized utterance
#[derive(Debug, Clone)]
pub struct Transcript {
    pub utterance_id: u64,
    /// Raw text as produced by the backend
    pub text: String,
    /// Finalized results are eligible for command dispatch; interim ones
    /// are observational only
    pub is_final: bool,
}

impl Transcript {
    /// Lower-cased, whitespace-trimmed form used for matching
    pub fn normalized(&self) -> String {
        self.text.trim().to_lowercase()
    }
}

/// Recognizer errors.
///
/// The split between recoverable and non-recoverable variants drives the
/// controller's restart policy: recoverable errors are treated like a
/// normal session end, non-recoverable ones suspend the loop until the
/// user intervenes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognizerError {
    #[error("Recognizer not available: {reason}")]
    NotAvailable { reason: String },

    #[error("Recognition session already running")]
    AlreadyRunning,

    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("Audio device lost: {0}")]
    DeviceLost(String),

    #[error("No speech detected")]
    NoSpeech,

    #[error("Backend error: {0}")]
    Backend(String),
}

impl RecognizerError {
    /// Recoverable errors restart the loop like a normal end; the rest
    /// stop it and surface a notification.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoSpeech | Self::Backend(_))
    }
}

/// Recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// BCP-47 language tag, e.g. "en-US"
    pub language: String,
    /// Emit partial recognition results
    pub partial_results: bool,
    /// Input device name override (backend default when `None`)
    pub device: Option<String>,
    /// Path to model directory or file, for backends that need one
    pub model_path: Option<String>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            partial_results: true,
            device: None,
            model_path: None,
        }
    }
}
