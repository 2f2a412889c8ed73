//! The voice-command controller
//!
//! One task owns the recognizer, the command registry, and the
//! [`LoopMachine`]; every transition is applied inside its `select!`
//! loop, so no two transitions ever interleave. Speech output runs in
//! its own task (see [`crate::speak`]) and reports back through the
//! synthesis-done channel.

pub mod machine;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use voxgate_stt::{RecognizerEvent, SpeechRecognizer, Transcript};
use voxgate_tts::SpeechRequest;

use crate::dispatch::{dispatch, CommandHandler, CommandRegistry, DispatchOutcome};
use crate::notify::Notifier;
use crate::prefs::PreferenceStore;
use crate::speak::SynthesisOutcome;
use machine::{Effect, LoopEvent, LoopMachine};

/// Spoken reply when a wake-prefixed utterance matches nothing
pub const UNKNOWN_COMMAND_RESPONSE: &str = "Sorry, I don't know that command.";

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Leading word a transcript must carry to be treated as a command
    pub wake_prefix: String,
    /// Restart the loop after every natural session end
    pub continuous: bool,
    /// Begin listening as soon as the runtime starts (unless muted)
    pub auto_start: bool,
    /// BCP-47 language tag handed to the recognizer backend
    pub language: String,
    /// Delay before any restart of the recognition loop; also applied
    /// after speech output so trailing audio is not captured
    pub restart_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            wake_prefix: "vox".to_string(),
            continuous: true,
            auto_start: true,
            language: "en-US".to_string(),
            restart_delay: Duration::from_millis(300),
        }
    }
}

/// Commands accepted from [`crate::runtime::ControllerHandle`]
pub(crate) enum ControllerCommand {
    Start,
    Stop,
    Toggle,
    Mute,
    Unmute,
    ToggleMute,
    Speak(SpeechRequest),
    Register { phrase: String, handler: CommandHandler },
    Shutdown,
}

pub(crate) struct VoiceController {
    machine: LoopMachine,
    config: ControllerConfig,
    recognizer: Box<dyn SpeechRecognizer>,
    recognizer_rx: mpsc::Receiver<RecognizerEvent>,
    cmd_rx: mpsc::UnboundedReceiver<ControllerCommand>,
    synth_tx: mpsc::Sender<SpeechRequest>,
    synth_done_rx: mpsc::Receiver<SynthesisOutcome>,
    registry: CommandRegistry,
    prefs: Box<dyn PreferenceStore>,
    notifier: Arc<dyn Notifier>,
    last_heard_tx: watch::Sender<Option<Transcript>>,
    restart_deadline: Option<tokio::time::Instant>,
}

impl VoiceController {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        machine: LoopMachine,
        config: ControllerConfig,
        recognizer: Box<dyn SpeechRecognizer>,
        recognizer_rx: mpsc::Receiver<RecognizerEvent>,
        cmd_rx: mpsc::UnboundedReceiver<ControllerCommand>,
        synth_tx: mpsc::Sender<SpeechRequest>,
        synth_done_rx: mpsc::Receiver<SynthesisOutcome>,
        registry: CommandRegistry,
        prefs: Box<dyn PreferenceStore>,
        notifier: Arc<dyn Notifier>,
        last_heard_tx: watch::Sender<Option<Transcript>>,
    ) -> Self {
        Self {
            machine,
            config,
            recognizer,
            recognizer_rx,
            cmd_rx,
            synth_tx,
            synth_done_rx,
            registry,
            prefs,
            notifier,
            last_heard_tx,
            restart_deadline: None,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("voice controller started");
        loop {
            let restart_deadline = self.restart_deadline;
            let restart_timer = async move {
                match restart_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    None | Some(ControllerCommand::Shutdown) => break,
                    Some(cmd) => self.on_command(cmd).await,
                },
                Some(ev) = self.recognizer_rx.recv() => self.on_recognizer_event(ev).await,
                Some(outcome) = self.synth_done_rx.recv() => {
                    if let SynthesisOutcome::Failed(error) = &outcome {
                        debug!("synthesis failed, resuming anyway: {}", error);
                    }
                    self.apply(LoopEvent::SynthesisFinished).await;
                }
                _ = restart_timer => {
                    self.restart_deadline = None;
                    self.apply(LoopEvent::RestartElapsed).await;
                }
            }
        }

        if let Err(e) = self.recognizer.stop().await {
            warn!("recognizer stop during shutdown: {}", e);
        }
        info!("voice controller stopped");
    }

    async fn on_command(&mut self, cmd: ControllerCommand) {
        use voxgate_foundation::ControllerState;

        match cmd {
            ControllerCommand::Start => self.apply(LoopEvent::StartRequested).await,
            ControllerCommand::Stop => self.apply(LoopEvent::StopRequested).await,
            ControllerCommand::Toggle => {
                let event = if self.machine.state() == ControllerState::Listening {
                    LoopEvent::StopRequested
                } else {
                    LoopEvent::StartRequested
                };
                self.apply(event).await;
            }
            ControllerCommand::Mute => self.apply(LoopEvent::MuteRequested).await,
            ControllerCommand::Unmute => self.apply(LoopEvent::UnmuteRequested).await,
            ControllerCommand::ToggleMute => {
                let event = if self.machine.state() == ControllerState::Muted {
                    LoopEvent::UnmuteRequested
                } else {
                    LoopEvent::MuteRequested
                };
                self.apply(event).await;
            }
            ControllerCommand::Speak(request) => {
                self.apply(LoopEvent::SpeakRequested(request)).await;
            }
            ControllerCommand::Register { phrase, handler } => {
                self.registry.register(&phrase, handler);
            }
            ControllerCommand::Shutdown => unreachable!("handled in run()"),
        }
    }

    async fn on_recognizer_event(&mut self, event: RecognizerEvent) {
        match event {
            RecognizerEvent::Started { session_id } => {
                debug!(session_id, "recognition session live");
                self.apply(LoopEvent::RecognizerStarted).await;
            }
            RecognizerEvent::Ended { session_id } => {
                debug!(session_id, "recognition session ended");
                self.apply(LoopEvent::RecognizerEnded).await;
            }
            RecognizerEvent::Error(err) if err.is_recoverable() => {
                // The session's own Ended event drives the restart
                debug!("recoverable recognizer error: {}", err);
            }
            RecognizerEvent::Error(err) => {
                self.apply(LoopEvent::RecognizerFailed(err)).await;
            }
            RecognizerEvent::Transcript(transcript) => self.on_transcript(transcript).await,
        }
    }

    async fn on_transcript(&mut self, transcript: Transcript) {
        let _ = self.last_heard_tx.send(Some(transcript.clone()));

        match dispatch(&self.registry, &self.config.wake_prefix, &transcript) {
            DispatchOutcome::Dispatched { phrase, via_substring } => {
                info!(%phrase, via_substring, "command dispatched");
            }
            DispatchOutcome::NoMatch => {
                debug!(text = %transcript.text, "no matching command");
                self.apply(LoopEvent::SpeakRequested(SpeechRequest::new(
                    UNKNOWN_COMMAND_RESPONSE,
                )))
                .await;
            }
            DispatchOutcome::MissingPrefix => {
                debug!(text = %transcript.text, "heard without wake prefix");
            }
            DispatchOutcome::NotFinal => {}
        }
    }

    /// Feed one event through the machine and perform its effects. An
    /// effect can produce a follow-up event (a failed start, a dead
    /// synthesis task); those are drained here rather than recursing.
    async fn apply(&mut self, event: LoopEvent) {
        let mut queue = VecDeque::new();
        queue.push_back(event);
        while let Some(event) = queue.pop_front() {
            for effect in self.machine.handle(event) {
                if let Some(follow_up) = self.execute(effect).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    async fn execute(&mut self, effect: Effect) -> Option<LoopEvent> {
        match effect {
            Effect::StartRecognizer => match self.recognizer.start().await {
                Ok(()) => None,
                Err(err) => {
                    warn!("recognizer start failed: {}", err);
                    Some(LoopEvent::RecognizerFailed(err))
                }
            },
            Effect::StopRecognizer => {
                if let Err(e) = self.recognizer.stop().await {
                    warn!("recognizer stop failed: {}", e);
                }
                None
            }
            Effect::ScheduleRestart(delay) => {
                self.restart_deadline = Some(tokio::time::Instant::now() + delay);
                None
            }
            Effect::CancelRestart => {
                self.restart_deadline = None;
                None
            }
            Effect::BeginSynthesis(request) => {
                if self.synth_tx.send(request).await.is_err() {
                    warn!("speech output task is gone; treating synthesis as finished");
                    Some(LoopEvent::SynthesisFinished)
                } else {
                    None
                }
            }
            Effect::PersistMute(muted) => {
                if let Err(e) = self.prefs.store_muted(muted) {
                    warn!("failed to persist mute preference: {}", e);
                }
                None
            }
            Effect::Notify(kind, message) => {
                self.notifier.notify(&message, kind);
                None
            }
        }
    }
}
