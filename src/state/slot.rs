//! Type-erased registry entry.

use super::{State, StateContext};
use crate::core::StateId;
use crate::machine::transition::PayloadType;
use crate::machine::TransitionError;
use std::any::Any;

/// Object-safe view of a registered state, letting the machine keep
/// states with different payload types in one table.
pub(crate) trait ErasedState<I: StateId> {
    fn id(&self) -> I;
    fn payload_type(&self) -> PayloadType;
    fn accepts(&self, payload: &dyn Any) -> bool;
    fn initialize(&mut self);
    fn begin(&self, payload: Box<dyn Any>) -> Result<(), TransitionError>;
    fn end(&self);
    fn dispose(&self);
}

pub(crate) struct Slot<I: StateId, S: State<I>> {
    state: S,
    ctx: StateContext<I, S::Payload>,
}

impl<I: StateId, S: State<I>> Slot<I, S> {
    pub(crate) fn new(state: S, ctx: StateContext<I, S::Payload>) -> Self {
        Self { state, ctx }
    }
}

impl<I: StateId, S: State<I>> ErasedState<I> for Slot<I, S> {
    fn id(&self) -> I {
        self.ctx.id()
    }

    fn payload_type(&self) -> PayloadType {
        PayloadType::of::<S::Payload>()
    }

    fn accepts(&self, payload: &dyn Any) -> bool {
        payload.is::<S::Payload>()
    }

    fn initialize(&mut self) {
        self.state.initialize(&self.ctx);
    }

    fn begin(&self, payload: Box<dyn Any>) -> Result<(), TransitionError> {
        let payload = payload.downcast::<S::Payload>().map_err(|_| {
            TransitionError::PayloadMismatch {
                target: self.id().name().to_string(),
                expected: self.payload_type().name,
                found: "another type",
            }
        })?;
        self.ctx.set_payload(*payload);
        self.ctx.state_begin()
    }

    fn end(&self) {
        self.ctx.state_end();
    }

    fn dispose(&self) {
        self.ctx.dispose();
    }
}
