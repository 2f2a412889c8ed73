use crate::error::ControllerError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Top-level controller state. Exactly one variant is active at a time.
///
/// `Listening` and `Speaking` are mutually exclusive by construction: there
/// is no `Listening -> Speaking` edge, so speech output can only begin after
/// the recognition loop has been stopped (`Listening -> Idle -> Speaking`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    Idle,
    Listening,
    Speaking,
    Muted,
}

pub struct StateManager {
    state: Arc<RwLock<ControllerState>>,
    state_tx: Sender<ControllerState>,
    state_rx: Receiver<ControllerState>,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager {
    pub fn new() -> Self {
        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        Self {
            state: Arc::new(RwLock::new(ControllerState::Idle)),
            state_tx,
            state_rx,
        }
    }

    pub fn transition(&self, new_state: ControllerState) -> Result<(), ControllerError> {
        let mut current = self.state.write();

        // Validate state transitions
        let valid = matches!(
            (&*current, &new_state),
            (ControllerState::Idle, ControllerState::Listening)
                | (ControllerState::Listening, ControllerState::Idle)
                | (ControllerState::Idle, ControllerState::Speaking)
                | (ControllerState::Speaking, ControllerState::Idle)
                | (ControllerState::Idle, ControllerState::Muted)
                | (ControllerState::Speaking, ControllerState::Muted)
                | (ControllerState::Muted, ControllerState::Idle)
        );

        if !valid {
            return Err(ControllerError::Fatal(format!(
                "Invalid state transition: {:?} -> {:?}",
                *current, new_state
            )));
        }

        tracing::debug!("State transition: {:?} -> {:?}", *current, new_state);
        *current = new_state;
        let _ = self.state_tx.send(new_state);
        Ok(())
    }

    pub fn current(&self) -> ControllerState {
        *self.state.read()
    }

    pub fn subscribe(&self) -> Receiver<ControllerState> {
        self.state_rx.clone()
    }
}
