//! Recognition-loop state machine
//!
//! The controller's behavior is expressed as one transition function:
//! [`LoopMachine::handle`] takes the current state plus a single event and
//! returns the side effects the driver must perform. Transitions are
//! applied synchronously inside the event that triggers them, and the
//! underlying [`StateManager`] rejects any edge that would let `Listening`
//! and `Speaking` coexist.

use std::sync::Arc;
use std::time::Duration;

use voxgate_foundation::{ControllerState, StateManager};
use voxgate_stt::RecognizerError;
use voxgate_tts::SpeechRequest;

use crate::notify::NoticeKind;

/// Events fed to the machine by the driver
#[derive(Debug)]
pub enum LoopEvent {
    /// `start()` from the public API (or auto-start)
    StartRequested,
    /// `stop()` from the public API
    StopRequested,
    /// `mute()` from the public API
    MuteRequested,
    /// `unmute()` from the public API
    UnmuteRequested,
    /// The recognizer confirmed a live session
    RecognizerStarted,
    /// The recognizer session terminated (natural end, explicit stop
    /// teardown, or a recoverable error treated as an end)
    RecognizerEnded,
    /// The recognizer failed to start or died non-recoverably
    RecognizerFailed(RecognizerError),
    /// The restart timer fired
    RestartElapsed,
    /// `speak()` from the public API (or the no-match fallback)
    SpeakRequested(SpeechRequest),
    /// One synthesis request finished (success and failure look the same
    /// here, so a TTS fault can never wedge the machine in `Speaking`)
    SynthesisFinished,
}

/// Side effects requested from the driver
#[derive(Debug, PartialEq)]
pub enum Effect {
    StartRecognizer,
    StopRecognizer,
    ScheduleRestart(Duration),
    CancelRestart,
    BeginSynthesis(SpeechRequest),
    PersistMute(bool),
    Notify(NoticeKind, String),
}

pub struct LoopMachine {
    states: Arc<StateManager>,
    continuous: bool,
    restart_delay: Duration,
    /// A restart timer is outstanding; its expiry re-checks everything
    restart_pending: bool,
    /// Outstanding synthesis requests; the loop may only resume at zero
    active_syntheses: u32,
    /// An "already running" start failure has burned its single retry
    start_retried: bool,
    /// A start/unmute arrived mid-synthesis and is deferred to its end
    resume_after_speech: bool,
}

impl LoopMachine {
    pub fn new(states: Arc<StateManager>, continuous: bool, restart_delay: Duration) -> Self {
        Self {
            states,
            continuous,
            restart_delay,
            restart_pending: false,
            active_syntheses: 0,
            start_retried: false,
            resume_after_speech: false,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.states.current()
    }

    fn go(&self, new_state: ControllerState) {
        if let Err(e) = self.states.transition(new_state) {
            // Unreachable if handle() is correct; never silently ignored
            tracing::error!("controller state machine bug: {}", e);
        }
    }

    /// Apply one event, returning the effects to perform, in order.
    pub fn handle(&mut self, event: LoopEvent) -> Vec<Effect> {
        use ControllerState::*;
        use Effect::*;
        use LoopEvent::*;

        match event {
            StartRequested => match self.state() {
                // Idempotent: one active session, mute takes precedence
                Listening | Muted => Vec::new(),
                Speaking => {
                    self.resume_after_speech = true;
                    Vec::new()
                }
                Idle => {
                    if self.active_syntheses > 0 {
                        self.resume_after_speech = true;
                        return Vec::new();
                    }
                    self.restart_pending = false;
                    self.go(Listening);
                    vec![CancelRestart, StartRecognizer]
                }
            },

            StopRequested => {
                self.restart_pending = false;
                self.resume_after_speech = false;
                match self.state() {
                    Listening => {
                        self.go(Idle);
                        vec![CancelRestart, StopRecognizer]
                    }
                    _ => vec![CancelRestart],
                }
            }

            MuteRequested => {
                if self.state() == Muted {
                    return Vec::new();
                }
                self.restart_pending = false;
                self.resume_after_speech = false;
                self.start_retried = false;
                // Stop first, then record the preference
                let mut effects = vec![CancelRestart];
                match self.state() {
                    Listening => {
                        effects.push(StopRecognizer);
                        self.go(Idle);
                        self.go(Muted);
                    }
                    Idle | Speaking => self.go(Muted),
                    Muted => unreachable!(),
                }
                effects.push(PersistMute(true));
                effects.push(Notify(NoticeKind::Info, "Voice control muted".to_string()));
                effects
            }

            UnmuteRequested => {
                if self.state() != Muted {
                    return Vec::new();
                }
                self.go(Idle);
                let mut effects = vec![
                    PersistMute(false),
                    Notify(NoticeKind::Success, "Voice control unmuted".to_string()),
                ];
                if self.active_syntheses > 0 {
                    self.resume_after_speech = true;
                } else {
                    self.go(Listening);
                    effects.push(StartRecognizer);
                }
                effects
            }

            RecognizerStarted => {
                self.start_retried = false;
                Vec::new()
            }

            RecognizerEnded => match self.state() {
                Listening => {
                    self.go(Idle);
                    if self.continuous {
                        self.restart_pending = true;
                        vec![ScheduleRestart(self.restart_delay)]
                    } else {
                        Vec::new()
                    }
                }
                // Stale end after an explicit stop, a mute, or a speak
                // handoff; the first end already dealt with it
                _ => Vec::new(),
            },

            RecognizerFailed(err) => self.on_recognizer_failed(err),

            RestartElapsed => {
                if !self.restart_pending {
                    return Vec::new();
                }
                self.restart_pending = false;
                // Re-check at fire time: mute (or a speak in progress)
                // wins the race against a pending restart
                match self.state() {
                    Idle if self.active_syntheses == 0 => {
                        self.go(Listening);
                        vec![StartRecognizer]
                    }
                    _ => Vec::new(),
                }
            }

            SpeakRequested(request) => {
                self.active_syntheses += 1;
                self.restart_pending = false;
                match self.state() {
                    Listening => {
                        // The microphone must be closed before audio out
                        self.go(Idle);
                        self.go(Speaking);
                        vec![CancelRestart, StopRecognizer, BeginSynthesis(request)]
                    }
                    Idle => {
                        self.go(Speaking);
                        vec![CancelRestart, BeginSynthesis(request)]
                    }
                    // Mute gates the microphone, not the voice
                    Speaking | Muted => vec![BeginSynthesis(request)],
                }
            }

            SynthesisFinished => {
                self.active_syntheses = self.active_syntheses.saturating_sub(1);
                if self.active_syntheses > 0 {
                    return Vec::new();
                }
                match self.state() {
                    Speaking => {
                        self.go(Idle);
                        self.resume_if_configured()
                    }
                    // Unmuted mid-synthesis; the deferred start runs now
                    Idle => self.resume_if_configured(),
                    _ => Vec::new(),
                }
            }
        }
    }

    fn resume_if_configured(&mut self) -> Vec<Effect> {
        if self.continuous || self.resume_after_speech {
            self.resume_after_speech = false;
            self.restart_pending = true;
            vec![Effect::ScheduleRestart(self.restart_delay)]
        } else {
            Vec::new()
        }
    }

    fn on_recognizer_failed(&mut self, err: RecognizerError) -> Vec<Effect> {
        use ControllerState::*;
        use Effect::*;

        if err == RecognizerError::AlreadyRunning {
            if !self.start_retried && self.state() == Listening {
                // Stop whatever is holding the session and retry once
                self.start_retried = true;
                self.restart_pending = true;
                self.go(Idle);
                return vec![StopRecognizer, ScheduleRestart(self.restart_delay)];
            }
            self.start_retried = false;
            if self.state() == Listening {
                self.go(Idle);
            }
            return vec![
                CancelRestart,
                Notify(
                    NoticeKind::Error,
                    "Could not start voice recognition".to_string(),
                ),
            ];
        }

        if err.is_recoverable() {
            // Same as a natural end; the restart path handles it
            return self.handle(LoopEvent::RecognizerEnded);
        }

        // Non-recoverable: stop, notify once, no automatic restart until
        // an explicit start()/unmute()
        self.restart_pending = false;
        if self.state() == Listening {
            self.go(Idle);
        }
        vec![
            CancelRestart,
            StopRecognizer,
            Notify(
                NoticeKind::Error,
                format!("Voice recognition stopped: {}", err),
            ),
        ]
    }
}
