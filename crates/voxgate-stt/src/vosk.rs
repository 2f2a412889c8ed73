//! Vosk recognizer backend
//!
//! Offline continuous recognition: a capture thread owns the microphone
//! (cpal) and a Vosk `Recognizer`, and pushes [`RecognizerEvent`]s into the
//! controller's event channel. One capture thread per session; `stop()`
//! raises a flag, the thread flushes the recognizer and emits `Ended`.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use vosk::{CompleteResult, DecodingState, Model, Recognizer};

use crate::types::{RecognizerConfig, RecognizerError, RecognizerEvent, Transcript};
use crate::{next_session_id, next_utterance_id, SpeechRecognizer};

const DEFAULT_MODEL_DIR: &str = "models/vosk-model-small-en-us-0.15";

pub struct VoskRecognizer {
    config: RecognizerConfig,
    event_tx: mpsc::Sender<RecognizerEvent>,
    session: Option<CaptureSession>,
}

struct CaptureSession {
    stop: Arc<AtomicBool>,
    handle: std::thread::JoinHandle<()>,
}

impl VoskRecognizer {
    pub fn new(config: RecognizerConfig, event_tx: mpsc::Sender<RecognizerEvent>) -> Self {
        Self {
            config,
            event_tx,
            session: None,
        }
    }

    fn model_path(&self) -> String {
        self.config
            .model_path
            .clone()
            .or_else(|| std::env::var("VOSK_MODEL_PATH").ok())
            .unwrap_or_else(|| DEFAULT_MODEL_DIR.to_string())
    }

    fn reap_finished_session(&mut self) {
        if let Some(session) = &self.session {
            if session.handle.is_finished() {
                self.session = None;
            }
        }
    }
}

#[async_trait]
impl SpeechRecognizer for VoskRecognizer {
    fn name(&self) -> &str {
        "vosk"
    }

    async fn is_available(&self) -> bool {
        Path::new(&self.model_path()).exists()
    }

    async fn start(&mut self) -> Result<(), RecognizerError> {
        self.reap_finished_session();
        if self.session.is_some() {
            return Err(RecognizerError::AlreadyRunning);
        }

        let model_path = self.model_path();
        if !Path::new(&model_path).exists() {
            return Err(RecognizerError::NotAvailable {
                reason: format!("Vosk model not found at '{}'", model_path),
            });
        }

        let session_id = next_session_id();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let event_tx = self.event_tx.clone();
        let config = self.config.clone();

        let handle = std::thread::Builder::new()
            .name(format!("vosk-capture-{}", session_id))
            .spawn(move || {
                run_capture(session_id, model_path, config, event_tx, thread_stop);
            })
            .map_err(|e| RecognizerError::Backend(format!("capture thread spawn: {}", e)))?;

        self.session = Some(CaptureSession { stop, handle });
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), RecognizerError> {
        if let Some(session) = self.session.take() {
            session.stop.store(true, Ordering::SeqCst);
            let _ = tokio::task::spawn_blocking(move || {
                let _ = session.handle.join();
            })
            .await;
        }
        Ok(())
    }
}

/// Capture thread body. Emits `Started` once the stream is live and
/// `Ended` exactly once on the way out, whatever the exit path.
fn run_capture(
    session_id: u64,
    model_path: String,
    config: RecognizerConfig,
    event_tx: mpsc::Sender<RecognizerEvent>,
    stop: Arc<AtomicBool>,
) {
    let send = |ev: RecognizerEvent| {
        let _ = event_tx.blocking_send(ev);
    };

    let model = match Model::new(&model_path) {
        Some(m) => m,
        None => {
            send(RecognizerEvent::Error(RecognizerError::NotAvailable {
                reason: format!("failed to load Vosk model from '{}'", model_path),
            }));
            send(RecognizerEvent::Ended { session_id });
            return;
        }
    };

    let host = cpal::default_host();
    let device = match &config.device {
        Some(name) => host
            .input_devices()
            .ok()
            .and_then(|mut devices| devices.find(|d| d.name().as_deref() == Ok(name.as_str()))),
        None => host.default_input_device(),
    };
    let device = match device {
        Some(d) => d,
        None => {
            send(RecognizerEvent::Error(RecognizerError::DeviceLost(
                "no input device available".to_string(),
            )));
            send(RecognizerEvent::Ended { session_id });
            return;
        }
    };

    let stream_config = match device.default_input_config() {
        Ok(c) => c,
        Err(e) => {
            send(RecognizerEvent::Error(RecognizerError::DeviceLost(format!(
                "input config: {}",
                e
            ))));
            send(RecognizerEvent::Ended { session_id });
            return;
        }
    };
    let sample_rate = stream_config.sample_rate().0 as f32;
    let channels = stream_config.channels() as usize;

    let mut recognizer = match Recognizer::new(&model, sample_rate) {
        Some(r) => r,
        None => {
            send(RecognizerEvent::Error(RecognizerError::Backend(format!(
                "failed to create recognizer at {} Hz",
                sample_rate
            ))));
            send(RecognizerEvent::Ended { session_id });
            return;
        }
    };
    recognizer.set_max_alternatives(0);
    recognizer.set_words(false);

    // Audio callbacks hand samples to this thread over a std channel; the
    // recognizer itself never crosses threads.
    let (sample_tx, sample_rx) = std::sync::mpsc::channel::<Vec<i16>>();
    let (err_tx, err_rx) = std::sync::mpsc::channel::<cpal::StreamError>();

    let stream = match stream_config.sample_format() {
        cpal::SampleFormat::I16 => {
            let sample_tx = sample_tx.clone();
            device.build_input_stream(
                &stream_config.config(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let mono: Vec<i16> = data
                        .chunks(channels)
                        .map(|frame| {
                            (frame.iter().map(|&s| s as i32).sum::<i32>() / channels as i32) as i16
                        })
                        .collect();
                    let _ = sample_tx.send(mono);
                },
                move |e| {
                    let _ = err_tx.send(e);
                },
                None,
            )
        }
        _ => {
            let sample_tx = sample_tx.clone();
            device.build_input_stream(
                &stream_config.config(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono: Vec<i16> = data
                        .chunks(channels)
                        .map(|frame| {
                            let sum: f32 = frame.iter().sum();
                            ((sum / channels as f32).clamp(-1.0, 1.0) * i16::MAX as f32) as i16
                        })
                        .collect();
                    let _ = sample_tx.send(mono);
                },
                move |e| {
                    let _ = err_tx.send(e);
                },
                None,
            )
        }
    };
    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            send(RecognizerEvent::Error(map_build_error(e)));
            send(RecognizerEvent::Ended { session_id });
            return;
        }
    };
    if let Err(e) = stream.play() {
        send(RecognizerEvent::Error(RecognizerError::DeviceLost(format!(
            "stream start: {}",
            e
        ))));
        send(RecognizerEvent::Ended { session_id });
        return;
    }

    send(RecognizerEvent::Started { session_id });
    debug!(session_id, %model_path, "vosk capture session live");

    let mut utterance_id = next_utterance_id();
    let mut last_partial = String::new();

    while !stop.load(Ordering::SeqCst) {
        if let Ok(e) = err_rx.try_recv() {
            warn!(session_id, "input stream error: {}", e);
            send(RecognizerEvent::Error(RecognizerError::DeviceLost(
                e.to_string(),
            )));
            break;
        }

        let pcm = match sample_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(pcm) => pcm,
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        match recognizer.accept_waveform(&pcm) {
            Ok(DecodingState::Finalized) => {
                if let Some(text) = complete_text(recognizer.result()) {
                    send(RecognizerEvent::Transcript(Transcript {
                        utterance_id,
                        text,
                        is_final: true,
                    }));
                }
                utterance_id = next_utterance_id();
                last_partial.clear();
            }
            Ok(DecodingState::Running) => {
                if config.partial_results {
                    let partial = recognizer.partial_result().partial.to_string();
                    if !partial.is_empty() && partial != last_partial {
                        last_partial = partial.clone();
                        send(RecognizerEvent::Transcript(Transcript {
                            utterance_id,
                            text: partial,
                            is_final: false,
                        }));
                    }
                }
            }
            Ok(DecodingState::Failed) => {
                send(RecognizerEvent::Error(RecognizerError::Backend(
                    "decoding failed for current chunk".to_string(),
                )));
            }
            Err(e) => {
                send(RecognizerEvent::Error(RecognizerError::Backend(format!(
                    "waveform acceptance failed: {:?}",
                    e
                ))));
                break;
            }
        }
    }

    drop(stream);

    // Flush whatever the recognizer was still holding
    if let Some(text) = complete_text(recognizer.final_result()) {
        send(RecognizerEvent::Transcript(Transcript {
            utterance_id,
            text,
            is_final: true,
        }));
    }

    send(RecognizerEvent::Ended { session_id });
    debug!(session_id, "vosk capture session ended");
}

fn complete_text(result: CompleteResult) -> Option<String> {
    let text = match result {
        CompleteResult::Single(single) => single.text.to_string(),
        CompleteResult::Multiple(multiple) => multiple
            .alternatives
            .first()
            .map(|a| a.text.to_string())
            .unwrap_or_default(),
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn map_build_error(e: cpal::BuildStreamError) -> RecognizerError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            RecognizerError::DeviceLost("device not available".to_string())
        }
        // Hosts surface microphone-permission refusals as backend errors
        cpal::BuildStreamError::BackendSpecific { err } => {
            RecognizerError::PermissionDenied(err.to_string())
        }
        other => RecognizerError::Backend(other.to_string()),
    }
}
