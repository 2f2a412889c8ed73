//! Speech synthesis abstraction layer for VoxGate
//!
//! This crate provides the foundational types and traits for speech
//! output: the [`SpeechSynthesizer`] trait, synthesis events and options,
//! voice metadata, and voice selection.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod engine;
pub mod error;
pub mod types;
pub mod voice;

#[cfg(feature = "espeak")]
pub mod espeak;

pub use engine::{SpeechSynthesizer, SynthesisEvent};
pub use error::{TtsError, TtsResult};
pub use types::{SpeechRequest, SynthesisOptions, TtsConfig, VoiceInfo};
pub use voice::select_voice;

/// Generates unique synthesis IDs
static SYNTHESIS_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique synthesis ID
pub fn next_synthesis_id() -> u64 {
    SYNTHESIS_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
