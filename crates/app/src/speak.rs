//! Speech output task
//!
//! Owns the synthesizer and serializes utterances: one request at a
//! time, one [`SynthesisOutcome`] back to the controller per request.
//! Failures are logged and reported as finished so the recognition loop
//! can resume; they never propagate.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use voxgate_tts::{select_voice, SpeechRequest, SpeechSynthesizer, SynthesisEvent, VoiceInfo};

/// Result of one synthesis request, as seen by the state machine
#[derive(Debug, Clone)]
pub enum SynthesisOutcome {
    Completed,
    Failed(String),
}

pub(crate) struct SpeechOutput {
    engine: Box<dyn SpeechSynthesizer>,
    request_rx: mpsc::Receiver<SpeechRequest>,
    done_tx: mpsc::Sender<SynthesisOutcome>,
    /// Voice catalog, fetched once on first use
    voices: Option<Vec<VoiceInfo>>,
}

impl SpeechOutput {
    pub(crate) fn new(
        engine: Box<dyn SpeechSynthesizer>,
        request_rx: mpsc::Receiver<SpeechRequest>,
        done_tx: mpsc::Sender<SynthesisOutcome>,
    ) -> Self {
        Self {
            engine,
            request_rx,
            done_tx,
            voices: None,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("speech output task started ({})", self.engine.name());

        while let Some(request) = self.request_rx.recv().await {
            let mut options = request.options.clone();
            if let Some(query) = options.voice.take() {
                options.voice = self.resolve_voice(&query).await;
            }

            let outcome = match self.engine.synthesize(&request.text, Some(&options)).await {
                Ok(SynthesisEvent::Completed { synthesis_id }) => {
                    debug!(synthesis_id, "utterance completed");
                    SynthesisOutcome::Completed
                }
                Ok(SynthesisEvent::Cancelled { synthesis_id }) => {
                    debug!(synthesis_id, "utterance cancelled");
                    SynthesisOutcome::Completed
                }
                Ok(SynthesisEvent::Failed { synthesis_id, error }) => {
                    warn!(synthesis_id, "synthesis failed: {}", error);
                    SynthesisOutcome::Failed(error)
                }
                Err(e) => {
                    warn!("synthesis error: {}", e);
                    SynthesisOutcome::Failed(e.to_string())
                }
            };

            if self.done_tx.send(outcome).await.is_err() {
                break;
            }
        }

        info!("speech output task stopped");
    }

    /// Map a loose voice query onto an engine voice id; `None` keeps the
    /// platform default.
    async fn resolve_voice(&mut self, query: &str) -> Option<String> {
        if self.voices.is_none() {
            self.voices = Some(match self.engine.list_voices().await {
                Ok(voices) => voices,
                Err(e) => {
                    debug!("voice list unavailable: {}", e);
                    Vec::new()
                }
            });
        }
        let found = select_voice(self.voices.as_deref().unwrap_or(&[]), query)
            .map(|v| v.id.clone());
        if found.is_none() {
            debug!("no voice matching '{}', using platform default", query);
        }
        found
    }
}
