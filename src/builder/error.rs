//! Registration and build errors.

use crate::machine::StartError;
use thiserror::Error;

/// Errors that can occur while registering states and building a machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("State '{state}' is already registered")]
    DuplicateState { state: String },

    #[error("No states registered. Call .register(state) before .build()")]
    NoStates,

    #[error("Initial state '{state}' is not registered")]
    UnknownInitialState { state: String },

    #[error("Initial state '{state}' expects a payload of type {expected}, got {found}")]
    InitialPayloadMismatch {
        state: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Initial state '{state}' expects a payload of type {expected}. Call .initial_with(state, payload)")]
    MissingInitialPayload {
        state: String,
        expected: &'static str,
    },

    #[error("Registration is closed once the machine has been initialized")]
    RegistrationClosed,

    #[error("{} configuration error(s): {}", .0.len(), summarize(.0))]
    Invalid(Vec<BuildError>),

    #[error("Auto-start failed: {0}")]
    Start(#[from] StartError),
}

impl BuildError {
    /// Individual errors, flattening [`BuildError::Invalid`].
    pub fn errors(&self) -> Vec<&BuildError> {
        match self {
            Self::Invalid(errors) => errors.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }
}

fn summarize(errors: &[BuildError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
