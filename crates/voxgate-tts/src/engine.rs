//! Synthesizer abstraction and synthesis events

use crate::error::TtsResult;
use crate::types::{SynthesisOptions, VoiceInfo};
use async_trait::async_trait;

/// Synthesis outcome, returned once playback has finished
#[derive(Debug, Clone)]
pub enum SynthesisEvent {
    /// Utterance played to completion
    Completed { synthesis_id: u64 },
    /// Synthesis or playback failed partway
    Failed { synthesis_id: u64, error: String },
    /// Synthesis was cancelled/stopped
    Cancelled { synthesis_id: u64 },
}

/// Core speech synthesis interface
///
/// Implementations play audio directly on the host; `synthesize` resolves
/// only after playback ends (or fails), which is what lets the controller
/// keep the microphone closed for the whole utterance.
#[async_trait]
pub trait SpeechSynthesizer: Send {
    /// Engine name/identifier
    fn name(&self) -> &str;

    /// Check if the engine is available on this system
    async fn is_available(&self) -> bool;

    /// Synthesize and play text. Resolves at playback completion.
    async fn synthesize(
        &mut self,
        text: &str,
        options: Option<&SynthesisOptions>,
    ) -> TtsResult<SynthesisEvent>;

    /// List voices offered by this engine
    async fn list_voices(&self) -> TtsResult<Vec<VoiceInfo>>;

    /// Set the voice used when a request carries no override
    async fn set_voice(&mut self, voice_id: &str) -> TtsResult<()>;

    /// Stop any ongoing synthesis
    async fn stop(&mut self) -> TtsResult<()>;
}
