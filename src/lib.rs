//! Tickstate: a tick-driven finite state machine
//!
//! Tickstate targets frame-loop hosts such as games. A host registers a
//! fixed set of states, starts the machine, and feeds it ticks every frame.
//! Each state subscribes to tick streams that are scoped to its own
//! lifetime: they emit only while the state is active, close when it ends
//! and reopen when it is entered again.
//!
//! # Core Concepts
//!
//! - **Identity**: every state is keyed by a [`StateId`] value, usually an enum
//! - **State**: behavior wired once in [`State::initialize`] to a [`StateContext`]
//! - **Lifecycle gate**: filters a tick stream down to one state's activation window
//! - **Deferred transitions**: requests are validated immediately, recorded in a
//!   single slot (last write wins) and applied after the frame's `LateUpdate`
//! - **Payloads**: a state may declare a payload type delivered to its begin stream
//!
//! # Example
//!
//! ```rust
//! use tickstate::builder::StateMachineBuilder;
//! use tickstate::state::{State, StateContext};
//! use tickstate::state_id;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! state_id! {
//!     enum Player { Idle, Run }
//! }
//!
//! struct Idle;
//!
//! impl State<Player> for Idle {
//!     type Payload = u32;
//!
//!     fn id(&self) -> Player {
//!         Player::Idle
//!     }
//!
//!     fn initialize(&mut self, _ctx: &StateContext<Player, u32>) {}
//! }
//!
//! struct Run {
//!     updates: Rc<Cell<u32>>,
//! }
//!
//! impl State<Player> for Run {
//!     type Payload = ();
//!
//!     fn id(&self) -> Player {
//!         Player::Run
//!     }
//!
//!     fn initialize(&mut self, ctx: &StateContext<Player>) {
//!         let updates = self.updates.clone();
//!         let machine = ctx.machine();
//!         ctx.update_stream().subscribe(move |_| {
//!             updates.set(updates.get() + 1);
//!             if updates.get() == 2 {
//!                 machine.transition_with(Player::Idle, updates.get()).unwrap();
//!             }
//!         });
//!     }
//! }
//!
//! let updates = Rc::new(Cell::new(0));
//! let mut machine = StateMachineBuilder::new()
//!     .register(Run { updates: updates.clone() })
//!     .register(Idle)
//!     .build()
//!     .unwrap();
//!
//! for _ in 0..4 {
//!     machine.run_frame(1.0 / 60.0).unwrap();
//! }
//! assert_eq!(machine.current_state(), Some(Player::Idle));
//! assert_eq!(updates.get(), 2);
//! ```

pub mod builder;
pub mod core;
pub mod machine;
pub mod state;
pub mod stream;

// Re-export commonly used types
pub use builder::{BuildError, RegisterStates, StateMachineBuilder};
pub use crate::core::{StateHistory, StateId, StateTransition, Tick, TickKind};
pub use machine::{MachineConfig, MachineHandle, StartError, StateMachine, TransitionError};
pub use state::{State, StateContext};
pub use stream::{Emitter, LifecycleGate, Stream, Subscription};
