//! Runtime wiring
//!
//! Builds the channels, spawns the controller and speech-output tasks,
//! and hands back the handles the embedding application talks to.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use voxgate_foundation::{ControllerError, ControllerState, StateManager};
use voxgate_stt::{RecognizerEvent, SpeechRecognizer, Transcript};
use voxgate_tts::{SpeechRequest, SpeechSynthesizer, SynthesisOptions};

use crate::controller::machine::LoopMachine;
use crate::controller::{ControllerCommand, ControllerConfig, VoiceController};
use crate::dispatch::CommandRegistry;
use crate::notify::{NoticeKind, Notifier};
use crate::prefs::PreferenceStore;
use crate::speak::{SpeechOutput, SynthesisOutcome};

/// Create the event channel a [`SpeechRecognizer`] backend is built
/// around; the receiver half goes to [`start`].
pub fn recognizer_channel() -> (
    mpsc::Sender<RecognizerEvent>,
    mpsc::Receiver<RecognizerEvent>,
) {
    mpsc::channel(64)
}

/// Cloneable, fire-and-forget API onto the running controller.
///
/// Every method is synchronous; the work happens on the controller task.
#[derive(Clone)]
pub struct ControllerHandle {
    cmd_tx: mpsc::UnboundedSender<ControllerCommand>,
    states: Arc<StateManager>,
    last_heard: watch::Receiver<Option<Transcript>>,
}

impl ControllerHandle {
    pub fn start(&self) {
        self.send(ControllerCommand::Start);
    }

    pub fn stop(&self) {
        self.send(ControllerCommand::Stop);
    }

    pub fn toggle(&self) {
        self.send(ControllerCommand::Toggle);
    }

    pub fn mute(&self) {
        self.send(ControllerCommand::Mute);
    }

    pub fn unmute(&self) {
        self.send(ControllerCommand::Unmute);
    }

    pub fn toggle_mute(&self) {
        self.send(ControllerCommand::ToggleMute);
    }

    pub fn speak(&self, text: impl Into<String>) {
        self.send(ControllerCommand::Speak(SpeechRequest::new(text)));
    }

    pub fn speak_with_options(&self, text: impl Into<String>, options: SynthesisOptions) {
        self.send(ControllerCommand::Speak(SpeechRequest::with_options(
            text, options,
        )));
    }

    /// Bind a phrase to an action; duplicate phrases overwrite the
    /// previous handler.
    pub fn register_command(&self, phrase: impl Into<String>, handler: impl Fn() + Send + 'static) {
        self.send(ControllerCommand::Register {
            phrase: phrase.into(),
            handler: Box::new(handler),
        });
    }

    pub fn state(&self) -> ControllerState {
        self.states.current()
    }

    pub fn subscribe_state(&self) -> crossbeam_channel::Receiver<ControllerState> {
        self.states.subscribe()
    }

    /// Most recent transcript, interim ones included ("last heard")
    pub fn last_heard(&self) -> watch::Receiver<Option<Transcript>> {
        self.last_heard.clone()
    }

    fn send(&self, cmd: ControllerCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            warn!("controller task is gone; command dropped");
        }
    }
}

/// Handle to the running controller tasks
pub struct AppHandle {
    pub controller: ControllerHandle,
    controller_task: JoinHandle<()>,
    speech_task: JoinHandle<()>,
}

impl AppHandle {
    /// Gracefully stop the controller and wait for both tasks
    pub async fn shutdown(self) {
        info!("shutting down VoxGate runtime...");
        let _ = self.controller.cmd_tx.send(ControllerCommand::Shutdown);
        let _ = self.controller_task.await;
        // The controller dropping its request sender ends the speech task
        let _ = self.speech_task.await;
        info!("VoxGate runtime shutdown complete");
    }
}

/// Start the controller runtime.
///
/// Verifies both speech backends are usable first: an unsupported
/// environment raises one notification and aborts initialization.
pub async fn start(
    config: ControllerConfig,
    recognizer: Box<dyn SpeechRecognizer>,
    recognizer_events: mpsc::Receiver<RecognizerEvent>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    prefs: Box<dyn PreferenceStore>,
    notifier: Arc<dyn Notifier>,
) -> Result<AppHandle, ControllerError> {
    if !recognizer.is_available().await {
        let message = format!(
            "Speech recognition ({}) is not available",
            recognizer.name()
        );
        notifier.notify(&message, NoticeKind::Error);
        return Err(ControllerError::Unsupported(message));
    }
    if !synthesizer.is_available().await {
        let message = format!("Speech synthesis ({}) is not available", synthesizer.name());
        notifier.notify(&message, NoticeKind::Error);
        return Err(ControllerError::Unsupported(message));
    }

    let muted = prefs.load_muted();
    let states = Arc::new(StateManager::new());
    if muted {
        states.transition(ControllerState::Muted)?;
        info!("starting muted (persisted preference)");
    }
    let machine = LoopMachine::new(states.clone(), config.continuous, config.restart_delay);

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (synth_tx, synth_rx) = mpsc::channel::<SpeechRequest>(16);
    let (done_tx, done_rx) = mpsc::channel::<SynthesisOutcome>(16);
    let (last_heard_tx, last_heard_rx) = watch::channel(None);

    let speech_task = tokio::spawn(SpeechOutput::new(synthesizer, synth_rx, done_tx).run());

    let auto_start = config.auto_start;
    let controller = VoiceController::new(
        machine,
        config,
        recognizer,
        recognizer_events,
        cmd_rx,
        synth_tx,
        done_rx,
        CommandRegistry::new(),
        prefs,
        notifier,
        last_heard_tx,
    );
    let controller_task = tokio::spawn(controller.run());

    let handle = ControllerHandle {
        cmd_tx,
        states,
        last_heard: last_heard_rx,
    };
    if auto_start && !muted {
        handle.start();
    }

    Ok(AppHandle {
        controller: handle,
        controller_task,
        speech_task,
    })
}
