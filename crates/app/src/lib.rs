//! VoxGate: a continuous, wake-word-gated voice-command controller.
//!
//! An always-on microphone stream becomes discrete commands: the
//! recognition loop keeps a [`voxgate_stt::SpeechRecognizer`] session
//! alive and recovers from every way it can stop, the dispatcher gates
//! transcripts on a wake prefix and matches them against registered
//! phrases, and the speech-output coordinator serializes
//! [`voxgate_tts::SpeechSynthesizer`] playback against the loop so the
//! system never hears its own voice.

pub mod controller;
pub mod dispatch;
pub mod notify;
pub mod prefs;
pub mod runtime;
pub mod speak;

pub use controller::{ControllerConfig, UNKNOWN_COMMAND_RESPONSE};
pub use runtime::{recognizer_channel, AppHandle, ControllerHandle};
