//! eSpeak synthesizer backend
//!
//! Shells out to `espeak`/`espeak-ng`, which plays straight to the default
//! audio output; the spawned process exiting is the playback-completion
//! signal the controller relies on.

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::engine::{SpeechSynthesizer, SynthesisEvent};
use crate::error::{TtsError, TtsResult};
use crate::next_synthesis_id;
use crate::types::{SynthesisOptions, TtsConfig, VoiceInfo};

const BASE_RATE_WPM: f32 = 175.0;

pub struct EspeakSynthesizer {
    config: TtsConfig,
    current_voice: Option<String>,
}

impl EspeakSynthesizer {
    pub fn new(config: TtsConfig) -> Self {
        Self {
            config,
            current_voice: None,
        }
    }

    /// Get the espeak command name (espeak or espeak-ng)
    async fn espeak_command() -> Option<&'static str> {
        for cmd in ["espeak", "espeak-ng"] {
            if Command::new(cmd).arg("--version").output().await.is_ok() {
                return Some(cmd);
            }
        }
        None
    }

    /// Build espeak arguments from config and per-request overrides
    fn build_args(&self, text: &str, options: Option<&SynthesisOptions>) -> Vec<String> {
        let mut args = Vec::new();

        let voice = options
            .and_then(|o| o.voice.as_ref())
            .or(self.current_voice.as_ref())
            .or(self.config.default_voice.as_ref());
        if let Some(voice_id) = voice {
            args.push("-v".to_string());
            args.push(voice_id.clone());
        }

        let rate = options
            .and_then(|o| o.rate)
            .or(self.config.rate)
            .unwrap_or(1.0);
        let wpm = ((BASE_RATE_WPM * rate) as u32).clamp(80, 450);
        args.push("-s".to_string());
        args.push(wpm.to_string());

        let pitch = options
            .and_then(|o| o.pitch)
            .or(self.config.pitch)
            .unwrap_or(1.0);
        let pitch_value = ((pitch * 50.0) as u32).min(99);
        args.push("-p".to_string());
        args.push(pitch_value.to_string());

        let volume = options
            .and_then(|o| o.volume)
            .or(self.config.volume)
            .unwrap_or(0.8);
        let amplitude = ((volume * 200.0) as u32).min(200);
        args.push("-a".to_string());
        args.push(amplitude.to_string());

        args.push(text.to_string());
        args
    }

    /// Parse `espeak --voices` output.
    /// Format: Pty Language Age/Gender VoiceName File Other
    fn parse_voice_list(output: &str) -> Vec<VoiceInfo> {
        let voice_regex = Regex::new(r"^\s*(\d+)\s+([\w-]+)\s+([MF\+-]?)\s+([\w\-_]+)\s+").unwrap();
        let mut voices = Vec::new();
        for line in output.lines().skip(1) {
            if let Some(captures) = voice_regex.captures(line) {
                let language = captures.get(2).map_or("unknown", |m| m.as_str()).to_string();
                let voice_id = captures.get(4).map_or("unknown", |m| m.as_str()).to_string();
                voices.push(VoiceInfo {
                    id: voice_id.clone(),
                    name: voice_id,
                    language,
                });
            }
        }
        voices
    }
}

#[async_trait]
impl SpeechSynthesizer for EspeakSynthesizer {
    fn name(&self) -> &str {
        "espeak"
    }

    async fn is_available(&self) -> bool {
        Self::espeak_command().await.is_some()
    }

    async fn synthesize(
        &mut self,
        text: &str,
        options: Option<&SynthesisOptions>,
    ) -> TtsResult<SynthesisEvent> {
        let synthesis_id = next_synthesis_id();
        if text.trim().is_empty() {
            return Err(TtsError::InvalidInput("empty text".to_string()));
        }
        let cmd = Self::espeak_command()
            .await
            .ok_or_else(|| TtsError::EngineNotAvailable("espeak not found in PATH".to_string()))?;

        let args = self.build_args(text, options);
        debug!(synthesis_id, "espeak {:?}", args);

        let status = Command::new(cmd).args(&args).status().await?;
        if status.success() {
            Ok(SynthesisEvent::Completed { synthesis_id })
        } else {
            Ok(SynthesisEvent::Failed {
                synthesis_id,
                error: format!("espeak exited with {}", status),
            })
        }
    }

    async fn list_voices(&self) -> TtsResult<Vec<VoiceInfo>> {
        let cmd = Self::espeak_command()
            .await
            .ok_or_else(|| TtsError::EngineNotAvailable("espeak not found in PATH".to_string()))?;
        let output = Command::new(cmd).arg("--voices").output().await?;
        if !output.status.success() {
            warn!("espeak --voices exited with {}", output.status);
            return Ok(Vec::new());
        }
        Ok(Self::parse_voice_list(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    async fn set_voice(&mut self, voice_id: &str) -> TtsResult<()> {
        self.current_voice = Some(voice_id.to_string());
        Ok(())
    }

    async fn stop(&mut self) -> TtsResult<()> {
        // Requests are serialized by the caller; nothing to interrupt here
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_args_uses_config_defaults() {
        let synth = EspeakSynthesizer::new(TtsConfig::default());
        let args = synth.build_args("hello", None);
        // rate 1.0 -> 175 wpm, pitch 1.0 -> 50, volume 0.8 -> 160
        assert_eq!(
            args,
            vec!["-s", "175", "-p", "50", "-a", "160", "hello"]
        );
    }

    #[test]
    fn build_args_applies_overrides() {
        let synth = EspeakSynthesizer::new(TtsConfig::default());
        let options = SynthesisOptions {
            voice: Some("en-gb".into()),
            rate: Some(2.0),
            pitch: Some(0.5),
            volume: Some(1.0),
        };
        let args = synth.build_args("hi", Some(&options));
        assert_eq!(
            args,
            vec!["-v", "en-gb", "-s", "350", "-p", "25", "-a", "200", "hi"]
        );
    }

    #[test]
    fn rate_is_clamped() {
        let synth = EspeakSynthesizer::new(TtsConfig::default());
        let options = SynthesisOptions {
            rate: Some(10.0),
            ..Default::default()
        };
        let args = synth.build_args("fast", Some(&options));
        assert!(args.contains(&"450".to_string()));
    }

    #[test]
    fn parse_voice_list_extracts_rows() {
        let listing = "\
Pty Language Age/Gender VoiceName          File          Other Languages
 5  af             M  afrikaans            other/af
 5  en-gb          M  english              en
 5  en-us          M  english-us           en-us
";
        let voices = EspeakSynthesizer::parse_voice_list(listing);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[1].id, "english");
        assert_eq!(voices[1].language, "en-gb");
        assert_eq!(voices[2].id, "english-us");
    }

    #[tokio::test]
    async fn availability_probe_does_not_panic() {
        let synth = EspeakSynthesizer::new(TtsConfig::default());
        // Whether or not espeak is installed in the test environment
        let _ = synth.is_available().await;
    }
}
