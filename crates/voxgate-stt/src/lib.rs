//! Speech recognition abstraction layer for VoxGate
//!
//! This crate provides the core abstractions for continuous speech
//! recognition: the [`SpeechRecognizer`] trait, recognizer lifecycle
//! events, transcripts, and the recognizer error taxonomy.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

pub mod types;

#[cfg(feature = "vosk-backend")]
pub mod vosk;

pub use types::{RecognizerConfig, RecognizerError, RecognizerEvent, Transcript};

/// Generates unique recognition session IDs
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique session ID
pub fn next_session_id() -> u64 {
    SESSION_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Generates unique utterance IDs
static UTTERANCE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique utterance ID
pub fn next_utterance_id() -> u64 {
    UTTERANCE_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Continuous speech recognition interface.
///
/// Implementations own the microphone for the lifetime of a session. They
/// are constructed with a `tokio::sync::mpsc::Sender<RecognizerEvent>` and
/// push every lifecycle event through it: `Started` once a session is live,
/// `Transcript` for partial and final results, `Error` for failures inside
/// a session, and `Ended` exactly once per session when it terminates for
/// any reason.
///
/// `start` returns an error only for failures detected before the session
/// is live (model missing, microphone busy); everything after that is
/// reported through the event channel.
#[async_trait]
pub trait SpeechRecognizer: Send {
    /// Backend name, for logs and diagnostics
    fn name(&self) -> &str;

    /// Check if the backend is usable on this system
    async fn is_available(&self) -> bool;

    /// Begin a recognition session. Fails with
    /// [`RecognizerError::AlreadyRunning`] if a session is active.
    async fn start(&mut self) -> Result<(), RecognizerError>;

    /// Terminate the active session, if any. Safe to call when stopped;
    /// an active session emits `Ended` before this resolves or shortly
    /// after.
    async fn stop(&mut self) -> Result<(), RecognizerError>;
}
