//! Core types for speech synthesis

use serde::{Deserialize, Serialize};

/// Synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Enable/disable speech output
    pub enabled: bool,
    /// Default voice to use
    pub default_voice: Option<String>,
    /// Speaking rate multiplier (1.0 is normal)
    pub rate: Option<f32>,
    /// Voice pitch (0.0-2.0, 1.0 is normal)
    pub pitch: Option<f32>,
    /// Volume (0.0-1.0)
    pub volume: Option<f32>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_voice: None,
            rate: Some(1.0),
            pitch: Some(1.0),
            volume: Some(0.8),
        }
    }
}

/// Per-request overrides for a single utterance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisOptions {
    /// Voice for this utterance, matched by name substring, then language
    pub voice: Option<String>,
    /// Speaking rate multiplier override
    pub rate: Option<f32>,
    /// Pitch override
    pub pitch: Option<f32>,
    /// Volume override
    pub volume: Option<f32>,
}

/// One utterance to speak; transient, lives for the duration of the request
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub options: SynthesisOptions,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: SynthesisOptions::default(),
        }
    }

    pub fn with_options(text: impl Into<String>, options: SynthesisOptions) -> Self {
        Self {
            text: text.into(),
            options,
        }
    }
}

/// Voice information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Unique voice identifier
    pub id: String,
    /// Human-readable voice name
    pub name: String,
    /// Language code (e.g., "en-US", "fr-FR")
    pub language: String,
}
