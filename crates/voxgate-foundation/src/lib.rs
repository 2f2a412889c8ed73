//! Foundation types for VoxGate
//!
//! This crate provides the controller state model, the observable state
//! manager, and the top-level error taxonomy shared by the rest of the
//! workspace.

pub mod error;
pub mod state;

pub use error::ControllerError;
pub use state::{ControllerState, StateManager};
