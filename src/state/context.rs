//! Per-state signals and gated tick streams.

use crate::core::{StateId, Tick, TickKind};
use crate::machine::{MachineHandle, TransitionError};
use crate::machine::handle::Shared;
use crate::stream::{Emitter, GatePhase, LifecycleGate, Stream};
use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;

struct ContextInner<I: StateId, P: 'static> {
    id: I,
    begin: Emitter<P>,
    end: Emitter<()>,
    payload: RefCell<Option<P>>,
    gates: Vec<LifecycleGate<Tick>>,
    machine: OnceCell<MachineHandle<I>>,
    active: Cell<bool>,
}

/// Everything a state wires itself to.
///
/// A context is created by the machine when a state is registered and
/// handed to [`State::initialize`](super::State::initialize). It exposes:
///
/// - [`begin_stream`](Self::begin_stream): one emission per activation,
///   carrying the payload of the transition that activated the state
/// - [`end_stream`](Self::end_stream): one emission per deactivation
/// - gated tick streams that only emit while the state is active
///
/// Cloning is cheap; clones share the same streams.
///
/// # Example
///
/// ```rust
/// use tickstate::builder::StateMachineBuilder;
/// use tickstate::state::{State, StateContext};
/// use tickstate::core::TickKind;
/// use tickstate::state_id;
///
/// state_id! {
///     enum Mode { Idle, Run }
/// }
///
/// struct Idle;
///
/// impl State<Mode> for Idle {
///     type Payload = ();
///
///     fn id(&self) -> Mode {
///         Mode::Idle
///     }
///
///     fn initialize(&mut self, ctx: &StateContext<Mode>) {
///         let machine = ctx.machine();
///         ctx.update_stream()
///             .filter(|tick| tick.frame >= 2)
///             .subscribe(move |_| machine.transition(Mode::Run).unwrap());
///     }
/// }
///
/// struct Run;
///
/// impl State<Mode> for Run {
///     type Payload = ();
///
///     fn id(&self) -> Mode {
///         Mode::Run
///     }
///
///     fn initialize(&mut self, _ctx: &StateContext<Mode>) {}
/// }
///
/// let mut machine = StateMachineBuilder::new()
///     .register(Idle)
///     .register(Run)
///     .build()
///     .unwrap();
///
/// for _ in 0..3 {
///     machine.run_frame(0.016).unwrap();
/// }
/// assert_eq!(machine.current_state(), Some(Mode::Run));
/// ```
pub struct StateContext<I: StateId, P: 'static = ()> {
    inner: Rc<ContextInner<I, P>>,
}

impl<I: StateId, P: 'static> Clone for StateContext<I, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<I: StateId, P: 'static> StateContext<I, P> {
    /// Build the context of state `id`, gating each of the machine's
    /// tick emitters on this state's begin/end signals.
    pub(crate) fn new(id: I, shared: &Shared<I>) -> Self {
        let begin: Emitter<P> = Emitter::new();
        let end: Emitter<()> = Emitter::new();

        let gates = TickKind::FRAME_ORDER
            .iter()
            .map(|kind| {
                LifecycleGate::new(
                    shared.tick_emitter(*kind).stream(),
                    begin.stream().unit(),
                    end.stream(),
                )
            })
            .collect();

        Self {
            inner: Rc::new(ContextInner {
                id,
                begin,
                end,
                payload: RefCell::new(None),
                gates,
                machine: OnceCell::new(),
                active: Cell::new(false),
            }),
        }
    }

    pub fn id(&self) -> I {
        self.inner.id
    }

    /// True between this state's begin and its next end.
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Emits once per activation with the activating payload.
    pub fn begin_stream(&self) -> Stream<P> {
        self.inner.begin.stream()
    }

    /// Emits once per deactivation, always before the next begin.
    pub fn end_stream(&self) -> Stream<()> {
        self.inner.end.stream()
    }

    /// Ticks of `kind`, forwarded only while this state is active.
    pub fn tick_stream(&self, kind: TickKind) -> Stream<Tick> {
        self.inner.gates[kind.index()].stream()
    }

    pub fn update_stream(&self) -> Stream<Tick> {
        self.tick_stream(TickKind::Update)
    }

    pub fn late_update_stream(&self) -> Stream<Tick> {
        self.tick_stream(TickKind::LateUpdate)
    }

    pub fn fixed_update_stream(&self) -> Stream<Tick> {
        self.tick_stream(TickKind::FixedUpdate)
    }

    pub fn draw_gizmos_stream(&self) -> Stream<Tick> {
        self.tick_stream(TickKind::DrawGizmos)
    }

    pub fn gui_stream(&self) -> Stream<Tick> {
        self.tick_stream(TickKind::Gui)
    }

    /// Phase of the gate behind the tick stream of `kind`.
    pub fn gate_phase(&self, kind: TickKind) -> GatePhase {
        self.gate(kind).phase()
    }

    /// Gate control stays with the machine; states only observe phases.
    pub(crate) fn gate(&self, kind: TickKind) -> &LifecycleGate<Tick> {
        &self.inner.gates[kind.index()]
    }

    /// Handle to the owning machine.
    pub fn machine(&self) -> MachineHandle<I> {
        self.inner
            .machine
            .get()
            .cloned()
            .unwrap_or_else(MachineHandle::detached)
    }

    /// Shorthand for `self.machine().transition(target)`.
    pub fn transition(&self, target: I) -> Result<(), TransitionError> {
        self.machine().transition(target)
    }

    /// Shorthand for `self.machine().transition_with(target, payload)`.
    pub fn transition_with<Q: 'static>(&self, target: I, payload: Q) -> Result<(), TransitionError> {
        self.machine().transition_with(target, payload)
    }

    /// Bind the owning machine. Only the first call has an effect.
    pub(crate) fn set_state_machine(&self, machine: MachineHandle<I>) -> bool {
        self.inner.machine.set(machine).is_ok()
    }

    /// Store the value the next begin emission delivers.
    pub(crate) fn set_payload(&self, payload: P) {
        *self.inner.payload.borrow_mut() = Some(payload);
    }

    /// Emit begin, consuming the stored payload. Gates open before user
    /// listeners run.
    pub(crate) fn state_begin(&self) -> Result<(), TransitionError> {
        let payload = self.inner.payload.borrow_mut().take();
        let Some(payload) = payload else {
            return Err(TransitionError::MissingPayload {
                target: self.inner.id.name().to_string(),
            });
        };
        self.inner.active.set(true);
        self.inner.begin.emit(&payload);
        Ok(())
    }

    /// Emit end. Gates close before user listeners run.
    pub(crate) fn state_end(&self) {
        self.inner.active.set(false);
        self.inner.end.emit(&());
    }

    /// Terminate every gate and drop all listeners.
    pub(crate) fn dispose(&self) {
        for gate in &self.inner.gates {
            gate.terminate();
        }
        self.inner.begin.clear();
        self.inner.end.clear();
        self.inner.active.set(false);
        self.inner.payload.borrow_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_id;

    state_id! {
        enum TestId {
            Idle,
        }
    }

    fn context() -> (Rc<Shared<TestId>>, StateContext<TestId, i32>) {
        let shared = Rc::new(Shared::new());
        let ctx = StateContext::new(TestId::Idle, &shared);
        (shared, ctx)
    }

    fn tick(shared: &Shared<TestId>, kind: TickKind) {
        shared.tick_emitter(kind).emit(&Tick {
            kind,
            frame: shared.frame.get(),
            dt: 0.0,
        });
    }

    #[test]
    fn begin_delivers_payload_once() {
        let (_shared, ctx) = context();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        ctx.begin_stream().subscribe(move |v| s.borrow_mut().push(*v));

        ctx.set_payload(42);
        ctx.state_begin().unwrap();

        assert_eq!(*seen.borrow(), vec![42]);
        assert!(ctx.is_active());
        assert!(matches!(
            ctx.state_begin(),
            Err(TransitionError::MissingPayload { .. })
        ));
    }

    #[test]
    fn gated_streams_follow_lifecycle() {
        let (shared, ctx) = context();
        let updates = Rc::new(Cell::new(0));
        let u = updates.clone();
        ctx.update_stream().subscribe(move |_| u.set(u.get() + 1));

        tick(&shared, TickKind::Update);
        ctx.set_payload(1);
        ctx.state_begin().unwrap();
        tick(&shared, TickKind::Update);
        tick(&shared, TickKind::LateUpdate);
        ctx.state_end();
        tick(&shared, TickKind::Update);

        assert_eq!(updates.get(), 1);
        assert!(!ctx.is_active());
    }

    #[test]
    fn gates_open_before_begin_listeners_run() {
        let (_shared, ctx) = context();
        let gate_open = Rc::new(Cell::new(false));
        let g = gate_open.clone();
        let observer = ctx.clone();
        ctx.begin_stream()
            .subscribe(move |_| g.set(observer.gate(TickKind::Update).is_open()));

        ctx.set_payload(0);
        ctx.state_begin().unwrap();
        assert!(gate_open.get());
        ctx.dispose();
    }

    #[test]
    fn every_gate_phase_follows_begin_and_end() {
        let (_shared, ctx) = context();
        for kind in TickKind::FRAME_ORDER {
            assert_eq!(ctx.gate_phase(kind), GatePhase::Closed);
        }

        ctx.set_payload(3);
        ctx.state_begin().unwrap();
        for kind in TickKind::FRAME_ORDER {
            assert_eq!(ctx.gate_phase(kind), GatePhase::Open);
        }

        ctx.state_end();
        for kind in TickKind::FRAME_ORDER {
            assert_eq!(ctx.gate_phase(kind), GatePhase::Closed);
        }
    }

    #[test]
    fn state_machine_is_set_once() {
        let (shared, ctx) = context();
        assert!(ctx.set_state_machine(MachineHandle::new(&shared)));
        assert!(!ctx.set_state_machine(MachineHandle::detached()));
        assert!(!ctx.machine().is_disposed());
    }

    #[test]
    fn unbound_context_cannot_transition() {
        let (_shared, ctx) = context();
        assert_eq!(ctx.transition(TestId::Idle), Err(TransitionError::Detached));
    }

    #[test]
    fn dispose_terminates_gates() {
        let (shared, ctx) = context();
        let updates = Rc::new(Cell::new(0));
        let u = updates.clone();
        ctx.update_stream().subscribe(move |_| u.set(u.get() + 1));

        ctx.dispose();
        ctx.set_payload(1);
        ctx.state_begin().unwrap();
        tick(&shared, TickKind::Update);

        assert_eq!(updates.get(), 0);
        assert_eq!(ctx.gate_phase(TickKind::Update), GatePhase::Terminated);
    }
}
