//! Shared machine core and the handle states use to reach it.

use super::error::TransitionError;
use super::transition::{PayloadType, PendingTransition};
use crate::core::{StateId, Tick, TickKind};
use crate::stream::Emitter;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tracing::{debug, error};

/// Machine data reachable from state callbacks.
///
/// The registry of state instances stays with the `StateMachine`; this
/// core only carries what a transition request needs to validate and
/// record itself.
pub(crate) struct Shared<I: StateId> {
    pub(crate) ticks: [Emitter<Tick>; TickKind::COUNT],
    pub(crate) directory: RefCell<HashMap<I, PayloadType>>,
    pub(crate) pending: RefCell<Option<PendingTransition<I>>>,
    pub(crate) current: Cell<Option<I>>,
    pub(crate) started: Cell<bool>,
    pub(crate) disposed: Cell<bool>,
    pub(crate) frame: Cell<u64>,
}

impl<I: StateId> Shared<I> {
    pub(crate) fn new() -> Self {
        Self {
            ticks: std::array::from_fn(|_| Emitter::new()),
            directory: RefCell::new(HashMap::new()),
            pending: RefCell::new(None),
            current: Cell::new(None),
            started: Cell::new(false),
            disposed: Cell::new(false),
            frame: Cell::new(0),
        }
    }

    pub(crate) fn tick_emitter(&self, kind: TickKind) -> &Emitter<Tick> {
        &self.ticks[kind.index()]
    }

    pub(crate) fn payload_type(&self, id: &I) -> Option<PayloadType> {
        self.directory.borrow().get(id).copied()
    }

    /// Validate a request and store it in the pending slot, replacing any
    /// earlier request.
    pub(crate) fn request(
        &self,
        target: I,
        payload: Box<dyn Any>,
        found: PayloadType,
    ) -> Result<(), TransitionError> {
        if self.disposed.get() {
            return Err(TransitionError::Disposed);
        }

        let Some(expected) = self.payload_type(&target) else {
            error!(state = target.name(), "Transition to unregistered state");
            return Err(TransitionError::UnknownState {
                target: target.name().to_string(),
            });
        };

        if expected != found {
            error!(
                state = target.name(),
                expected = expected.name,
                found = found.name,
                "Transition payload type mismatch"
            );
            return Err(TransitionError::PayloadMismatch {
                target: target.name().to_string(),
                expected: expected.name,
                found: found.name,
            });
        }

        let previous = self
            .pending
            .borrow_mut()
            .replace(PendingTransition { target, payload });
        match previous {
            Some(previous) => debug!(
                state = target.name(),
                overwritten = previous.target.name(),
                "Pending transition overwritten"
            ),
            None => debug!(state = target.name(), "Transition requested"),
        }
        Ok(())
    }

    pub(crate) fn take_pending(&self) -> Option<PendingTransition<I>> {
        self.pending.borrow_mut().take()
    }
}

/// Non-owning reference to a [`StateMachine`](super::StateMachine).
///
/// Every registered state receives one. It stays valid while the machine
/// is alive; afterwards every request fails with
/// [`TransitionError::Detached`].
pub struct MachineHandle<I: StateId> {
    shared: Weak<Shared<I>>,
}

impl<I: StateId> Clone for MachineHandle<I> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<I: StateId> std::fmt::Debug for MachineHandle<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineHandle")
            .field("attached", &(self.shared.strong_count() > 0))
            .field("current", &self.current_state())
            .finish()
    }
}

impl<I: StateId> MachineHandle<I> {
    pub(crate) fn new(shared: &Rc<Shared<I>>) -> Self {
        Self {
            shared: Rc::downgrade(shared),
        }
    }

    /// A handle bound to no machine.
    pub fn detached() -> Self {
        Self {
            shared: Weak::new(),
        }
    }

    fn shared(&self) -> Result<Rc<Shared<I>>, TransitionError> {
        self.shared.upgrade().ok_or(TransitionError::Detached)
    }

    /// Request a transition to a payload-less state.
    ///
    /// The change is applied after the current frame's `LateUpdate` tick.
    pub fn transition(&self, target: I) -> Result<(), TransitionError> {
        self.transition_with(target, ())
    }

    /// Request a transition that delivers `payload` to the target's
    /// begin stream.
    pub fn transition_with<P: 'static>(&self, target: I, payload: P) -> Result<(), TransitionError> {
        self.shared()?
            .request(target, Box::new(payload), PayloadType::of::<P>())
    }

    /// Identity of the active state, if the machine has started.
    pub fn current_state(&self) -> Option<I> {
        self.shared.upgrade().and_then(|shared| shared.current.get())
    }

    /// Target of the transition waiting for the end of the frame.
    pub fn pending_target(&self) -> Option<I> {
        let shared = self.shared.upgrade()?;
        let pending = shared.pending.borrow();
        pending.as_ref().map(|p| p.target)
    }

    pub fn is_started(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.started.get())
    }

    pub fn is_disposed(&self) -> bool {
        self.shared
            .upgrade()
            .map_or(true, |shared| shared.disposed.get())
    }

    /// Frames completed so far.
    pub fn frame_count(&self) -> u64 {
        self.shared
            .upgrade()
            .map_or(0, |shared| shared.frame.get())
    }
}
