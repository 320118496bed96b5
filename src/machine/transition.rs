//! The pending-transition slot.

use crate::core::StateId;
use std::any::{type_name, Any, TypeId};

/// Runtime description of a payload type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PayloadType {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
}

impl PayloadType {
    pub(crate) fn of<P: 'static>() -> Self {
        Self {
            id: TypeId::of::<P>(),
            name: type_name::<P>(),
        }
    }

    pub(crate) fn is_unit(&self) -> bool {
        self.id == TypeId::of::<()>()
    }
}

/// A requested but not yet applied state change.
///
/// The machine holds at most one; a later request replaces an earlier
/// one within the same frame.
#[derive(Debug)]
pub(crate) struct PendingTransition<I: StateId> {
    pub(crate) target: I,
    pub(crate) payload: Box<dyn Any>,
}
