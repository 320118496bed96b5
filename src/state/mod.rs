//! State behavior and the context states wire themselves to.
//!
//! A state is any type implementing [`State`]. Its `initialize` runs once,
//! after every state has been registered and before the first tick, and
//! should only subscribe to the streams of its [`StateContext`]. Those
//! subscriptions stay inert until the machine begins the state.
//!
//! Beginning and ending states is the machine's job alone: the context
//! keeps those entry points crate-private.

mod context;
pub(crate) mod slot;

pub use context::StateContext;

use crate::core::StateId;

/// A unit of behavior registered with a [`StateMachine`](crate::machine::StateMachine).
///
/// `Payload` is the value delivered to the state's begin stream by the
/// transition that activates it. Use `()` for states that take none.
pub trait State<I: StateId>: 'static {
    /// Value carried by this state's begin signal.
    type Payload: 'static;

    /// Registry key of this state. Must be stable.
    fn id(&self) -> I;

    /// Wire the state's behavior to its context streams.
    ///
    /// Runs once. Must not assume the state is active.
    fn initialize(&mut self, ctx: &StateContext<I, Self::Payload>);
}
