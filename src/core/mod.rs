//! Core value types of the state machine.
//!
//! This module contains plain data with no machine state attached:
//! - State identities via the `StateId` trait
//! - Host tick kinds and tick values
//! - Transition history tracking

mod history;
mod id;
mod tick;

pub use history::{StateHistory, StateTransition};
pub use id::StateId;
pub use tick::{Tick, TickKind};
