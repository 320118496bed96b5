//! Event plumbing: emitters, streams and lifecycle gates.
//!
//! Everything here is single-threaded (`Rc`-based) and synchronous: an
//! emission runs every listener to completion before `emit` returns.

mod emitter;
mod gate;
mod observable;
mod subscription;

pub use emitter::Emitter;
pub use gate::{GatePhase, LifecycleGate};
pub use observable::{Listener, Stream};
pub use subscription::Subscription;
