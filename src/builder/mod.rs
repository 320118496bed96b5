//! Builder API for ergonomic state machine construction.
//!
//! This module provides a fluent builder that validates a whole
//! registration set in one pass, the [`RegisterStates`] host hook, and the
//! [`state_id!`](crate::state_id) macro for declaring identities.

pub mod error;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use machine::{RegisterStates, StateMachineBuilder};
