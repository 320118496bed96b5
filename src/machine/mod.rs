//! The stateful shell: registration, activation and transitions.
//!
//! # Frame model
//!
//! The host delivers ticks through [`StateMachine::tick`] (or a whole frame
//! through [`StateMachine::run_frame`]) in [`TickKind::FRAME_ORDER`](crate::core::TickKind::FRAME_ORDER).
//! State callbacks may request transitions at any point; the request is
//! validated immediately and stored in a single pending slot, later
//! requests replacing earlier ones. Right after the frame's `LateUpdate`
//! tick the machine ends the active state and begins the target.

mod config;
mod error;
pub(crate) mod handle;
mod state_machine;
pub(crate) mod transition;

pub use config::MachineConfig;
pub use error::{StartError, TransitionError};
pub use handle::MachineHandle;
pub use state_machine::{MachinePhase, StateMachine};
