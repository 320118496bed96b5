//! Start and transition errors.

use thiserror::Error;

/// Errors reported when a transition is requested or applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("No state registered for '{target}'")]
    UnknownState { target: String },

    #[error("State '{target}' expects a payload of type {expected}, got {found}")]
    PayloadMismatch {
        target: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("State '{target}' began without a payload")]
    MissingPayload { target: String },

    #[error("State machine has been disposed")]
    Disposed,

    #[error("State is not attached to a live state machine")]
    Detached,
}

/// Errors reported by [`StateMachine::start`](super::StateMachine::start).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StartError {
    #[error("No current state. Register at least one state or call set_initial before start")]
    NoCurrentState,

    #[error("State machine already started")]
    AlreadyStarted,

    #[error("Initial state '{state}' expects a payload of type {expected}. Call set_initial_with")]
    MissingInitialPayload {
        state: String,
        expected: &'static str,
    },

    #[error("State machine has been disposed")]
    Disposed,

    #[error(transparent)]
    Transition(#[from] TransitionError),
}
