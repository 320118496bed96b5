//! Tick-driven state machine.

use super::config::MachineConfig;
use super::error::{StartError, TransitionError};
use super::handle::{MachineHandle, Shared};
use super::transition::{PayloadType, PendingTransition};
use crate::builder::BuildError;
use crate::core::{StateHistory, StateId, StateTransition, Tick, TickKind};
use crate::state::slot::{ErasedState, Slot};
use crate::state::{State, StateContext};
use chrono::Utc;
use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, error, info};

/// Lifecycle phase of the machine itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MachinePhase {
    /// Accepting registrations.
    Registering,
    /// Every state's `initialize` has run; registration is closed.
    Initialized,
    /// A state is active and ticks are routed to it.
    Running,
    /// Torn down; gates are terminated for good.
    Disposed,
}

/// Finite state machine driven by host ticks.
///
/// States are registered once, before the machine starts. After
/// [`start`](Self::start) exactly one state is active. Transitions
/// requested during a frame are applied right after that frame's
/// `LateUpdate` tick: the active state ends, then the target begins.
pub struct StateMachine<I: StateId> {
    shared: Rc<Shared<I>>,
    states: Vec<Box<dyn ErasedState<I>>>,
    index: HashMap<I, usize>,
    initial: Option<I>,
    initial_payload: Option<Box<dyn Any>>,
    current: Option<usize>,
    phase: MachinePhase,
    history: StateHistory<I>,
    config: MachineConfig,
}

impl<I: StateId> Default for StateMachine<I> {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}

impl<I: StateId> StateMachine<I> {
    /// Create an empty machine.
    ///
    /// `config.auto_start` is honored by the builder only; a machine
    /// created here starts when [`start`](Self::start) is called.
    pub fn new(config: MachineConfig) -> Self {
        let history = match config.history_limit {
            Some(limit) => StateHistory::with_limit(limit),
            None => StateHistory::new(),
        };
        Self {
            shared: Rc::new(Shared::new()),
            states: Vec::new(),
            index: HashMap::new(),
            initial: None,
            initial_payload: None,
            current: None,
            phase: MachinePhase::Registering,
            history,
            config,
        }
    }

    /// Register a state under its identity.
    ///
    /// The first registered state becomes the initial state unless
    /// [`set_initial`](Self::set_initial) overrides it.
    pub fn register<S: State<I>>(&mut self, state: S) -> Result<(), BuildError> {
        if self.phase != MachinePhase::Registering {
            return Err(BuildError::RegistrationClosed);
        }
        let id = state.id();
        if self.index.contains_key(&id) {
            return Err(BuildError::DuplicateState {
                state: id.name().to_string(),
            });
        }

        let ctx: StateContext<I, S::Payload> = StateContext::new(id, &self.shared);
        ctx.set_state_machine(self.handle());

        let payload_type = PayloadType::of::<S::Payload>();
        self.shared.directory.borrow_mut().insert(id, payload_type);
        self.index.insert(id, self.states.len());
        self.states.push(Box::new(Slot::new(state, ctx)));

        if self.initial.is_none() {
            self.initial = Some(id);
        }
        debug!(state = id.name(), payload = payload_type.name, "State registered");
        Ok(())
    }

    /// Make `id` the initial state. Only valid for payload-less states.
    pub fn set_initial(&mut self, id: I) -> Result<(), BuildError> {
        self.set_initial_with(id, ())
    }

    /// Make `id` the initial state, delivering `payload` to its first
    /// begin.
    pub fn set_initial_with<P: 'static>(&mut self, id: I, payload: P) -> Result<(), BuildError> {
        if let Some(expected) = self.shared.payload_type(&id) {
            let found = PayloadType::of::<P>();
            if expected != found {
                return Err(BuildError::InitialPayloadMismatch {
                    state: id.name().to_string(),
                    expected: expected.name,
                    found: found.name,
                });
            }
        }
        self.set_initial_boxed(id, Box::new(payload))
    }

    pub(crate) fn set_initial_boxed(
        &mut self,
        id: I,
        payload: Box<dyn Any>,
    ) -> Result<(), BuildError> {
        if self.phase != MachinePhase::Registering {
            return Err(BuildError::RegistrationClosed);
        }
        let Some(&idx) = self.index.get(&id) else {
            return Err(BuildError::UnknownInitialState {
                state: id.name().to_string(),
            });
        };
        if !self.states[idx].accepts(&*payload) {
            return Err(BuildError::InitialPayloadMismatch {
                state: id.name().to_string(),
                expected: self.states[idx].payload_type().name,
                found: "another type",
            });
        }
        self.initial = Some(id);
        self.initial_payload = Some(payload);
        Ok(())
    }

    /// Run every state's `initialize` in registration order and close
    /// registration. Later calls do nothing.
    pub fn initialize(&mut self) {
        if self.phase != MachinePhase::Registering {
            return;
        }
        for state in &mut self.states {
            state.initialize();
        }
        self.phase = MachinePhase::Initialized;
        debug!(states = self.states.len(), "States initialized");
    }

    /// Begin the initial state.
    ///
    /// Initializes the states first if that has not happened yet. The
    /// initial state is checked before registration closes, so after a
    /// `NoCurrentState` or `MissingInitialPayload` failure the host can
    /// still register states or set the initial state and retry.
    pub fn start(&mut self) -> Result<(), StartError> {
        match self.phase {
            MachinePhase::Disposed => return Err(StartError::Disposed),
            MachinePhase::Running => return Err(StartError::AlreadyStarted),
            _ => {}
        }

        let Some(initial) = self.initial else {
            error!("Cannot start state machine: no current state. Register a state first");
            return Err(StartError::NoCurrentState);
        };
        let idx = self.index[&initial];
        let payload: Box<dyn Any> = match self.initial_payload.take() {
            Some(payload) => payload,
            None if self.states[idx].payload_type().is_unit() => Box::new(()),
            None => {
                let expected = self.states[idx].payload_type().name;
                error!(state = initial.name(), expected, "Initial state needs a payload");
                return Err(StartError::MissingInitialPayload {
                    state: initial.name().to_string(),
                    expected,
                });
            }
        };
        self.initialize();

        self.current = Some(idx);
        self.shared.current.set(Some(initial));
        self.shared.started.set(true);
        self.phase = MachinePhase::Running;
        info!(state = initial.name(), "State machine started");

        self.states[idx].begin(payload)?;
        Ok(())
    }

    /// Deliver one tick of `kind` to the active state's gated streams.
    ///
    /// After a `LateUpdate` tick the pending transition, if any, is
    /// applied and the frame counter advances.
    pub fn tick(&mut self, kind: TickKind, dt: f32) -> Result<(), TransitionError> {
        if self.phase == MachinePhase::Disposed {
            return Err(TransitionError::Disposed);
        }
        let tick = Tick {
            kind,
            frame: self.shared.frame.get(),
            dt,
        };
        self.shared.tick_emitter(kind).emit(&tick);

        if !kind.ends_frame() {
            return Ok(());
        }
        let applied = match self.phase {
            MachinePhase::Running => self.apply_pending(),
            _ => Ok(()),
        };
        self.shared.frame.set(tick.frame + 1);
        applied
    }

    /// Deliver one tick of every kind in frame order.
    pub fn run_frame(&mut self, dt: f32) -> Result<(), TransitionError> {
        for kind in TickKind::FRAME_ORDER {
            self.tick(kind, dt)?;
        }
        Ok(())
    }

    /// Apply the pending transition: end the active state, then begin
    /// the target with the recorded payload.
    ///
    /// The slot is emptied before any listener runs, so requests made
    /// from end/begin listeners wait for the next frame.
    fn apply_pending(&mut self) -> Result<(), TransitionError> {
        let Some(PendingTransition { target, payload }) = self.shared.take_pending() else {
            return Ok(());
        };
        let Some(&next) = self.index.get(&target) else {
            return Err(TransitionError::UnknownState {
                target: target.name().to_string(),
            });
        };
        if !self.states[next].accepts(&*payload) {
            return Err(TransitionError::PayloadMismatch {
                target: target.name().to_string(),
                expected: self.states[next].payload_type().name,
                found: "another type",
            });
        }

        let from = self.current.map(|idx| self.states[idx].id());
        if let Some(idx) = self.current {
            self.states[idx].end();
        }

        self.current = Some(next);
        self.shared.current.set(Some(target));
        let frame = self.shared.frame.get();
        if let Some(from) = from {
            info!(from = from.name(), to = target.name(), frame, "Transition applied");
            if self.config.record_history {
                self.history.record(StateTransition {
                    from,
                    to: target,
                    frame,
                    timestamp: Utc::now(),
                });
            }
        }

        self.states[next].begin(payload)
    }

    /// Identity of the active state.
    pub fn current_state(&self) -> Option<I> {
        self.current.map(|idx| self.states[idx].id())
    }

    /// Target of the transition waiting for the end of the frame.
    pub fn pending_target(&self) -> Option<I> {
        self.handle().pending_target()
    }

    /// The state that begins on [`start`](Self::start).
    pub fn initial_state(&self) -> Option<I> {
        self.initial
    }

    /// Handle for requesting transitions from outside a state.
    pub fn handle(&self) -> MachineHandle<I> {
        MachineHandle::new(&self.shared)
    }

    /// Request a transition to a payload-less state.
    pub fn transition(&self, target: I) -> Result<(), TransitionError> {
        self.handle().transition(target)
    }

    /// Request a transition delivering `payload` to the target.
    pub fn transition_with<P: 'static>(&self, target: I, payload: P) -> Result<(), TransitionError> {
        self.handle().transition_with(target, payload)
    }

    /// Registered identities in registration order.
    pub fn state_ids(&self) -> impl Iterator<Item = I> + '_ {
        self.states.iter().map(|state| state.id())
    }

    pub fn contains(&self, id: &I) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn phase(&self) -> MachinePhase {
        self.phase
    }

    pub fn is_started(&self) -> bool {
        self.phase == MachinePhase::Running
    }

    /// Frames completed so far.
    pub fn frame_count(&self) -> u64 {
        self.shared.frame.get()
    }

    pub fn history(&self) -> &StateHistory<I> {
        &self.history
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Tear the machine down: terminate every gate, drop all listeners
    /// and the pending transition. The active state does not receive an
    /// end signal.
    pub fn dispose(&mut self) {
        if self.phase == MachinePhase::Disposed {
            return;
        }
        for state in &self.states {
            state.dispose();
        }
        for emitter in &self.shared.ticks {
            emitter.clear();
        }
        self.shared.take_pending();
        self.shared.disposed.set(true);
        self.shared.current.set(None);
        self.current = None;
        self.phase = MachinePhase::Disposed;
        debug!("State machine disposed");
    }
}

impl<I: StateId> std::fmt::Debug for StateMachine<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("phase", &self.phase)
            .field("current", &self.current_state())
            .field("states", &self.state_ids().collect::<Vec<_>>())
            .field("frame", &self.frame_count())
            .finish()
    }
}

impl<I: StateId> Drop for StateMachine<I> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_id;
    use std::cell::{Cell, RefCell};

    state_id! {
        enum TestId {
            Idle,
            Run,
            Appeal,
        }
    }

    type Log = Rc<RefCell<Vec<String>>>;

    /// Logs begin/end/update events as "<State>:<event>".
    struct Probe {
        id: TestId,
        log: Log,
    }

    impl State<TestId> for Probe {
        type Payload = ();

        fn id(&self) -> TestId {
            self.id
        }

        fn initialize(&mut self, ctx: &StateContext<TestId>) {
            let name = self.id.name().to_string();
            for (event, stream) in [
                ("begin", ctx.begin_stream()),
                ("end", ctx.end_stream()),
            ] {
                let log = self.log.clone();
                let name = name.clone();
                stream.subscribe(move |_| log.borrow_mut().push(format!("{name}:{event}")));
            }
            let log = self.log.clone();
            ctx.update_stream()
                .subscribe(move |t| log.borrow_mut().push(format!("{name}:update@{}", t.frame)));
        }
    }

    struct Typed {
        seen: Rc<RefCell<Vec<i32>>>,
    }

    impl State<TestId> for Typed {
        type Payload = i32;

        fn id(&self) -> TestId {
            TestId::Appeal
        }

        fn initialize(&mut self, ctx: &StateContext<TestId, i32>) {
            let seen = self.seen.clone();
            ctx.begin_stream().subscribe(move |v| seen.borrow_mut().push(*v));
        }
    }

    fn probe_machine(log: &Log) -> StateMachine<TestId> {
        let mut machine = StateMachine::default();
        for id in [TestId::Idle, TestId::Run] {
            machine
                .register(Probe {
                    id,
                    log: log.clone(),
                })
                .unwrap();
        }
        machine
    }

    #[test]
    fn first_registered_state_is_initial() {
        let log = Log::default();
        let mut machine = probe_machine(&log);
        assert_eq!(machine.initial_state(), Some(TestId::Idle));
        assert_eq!(machine.current_state(), None);

        machine.start().unwrap();
        assert_eq!(machine.current_state(), Some(TestId::Idle));
        assert_eq!(*log.borrow(), vec!["Idle:begin"]);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let log = Log::default();
        let mut machine = probe_machine(&log);
        let err = machine
            .register(Probe {
                id: TestId::Idle,
                log: log.clone(),
            })
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::DuplicateState {
                state: "Idle".to_string()
            }
        );
        assert_eq!(machine.len(), 2);
    }

    #[test]
    fn registration_closes_after_initialize() {
        let log = Log::default();
        let mut machine: StateMachine<TestId> = StateMachine::default();
        machine.initialize();
        let err = machine
            .register(Probe {
                id: TestId::Idle,
                log,
            })
            .unwrap_err();
        assert_eq!(err, BuildError::RegistrationClosed);
    }

    #[test]
    fn start_without_states_fails() {
        let mut machine: StateMachine<TestId> = StateMachine::default();
        assert_eq!(machine.start(), Err(StartError::NoCurrentState));
        assert!(!machine.is_started());
    }

    #[test]
    fn start_twice_fails() {
        let log = Log::default();
        let mut machine = probe_machine(&log);
        machine.start().unwrap();
        assert_eq!(machine.start(), Err(StartError::AlreadyStarted));
    }

    #[test]
    fn set_initial_overrides_first_registered() {
        let log = Log::default();
        let mut machine = probe_machine(&log);
        machine.set_initial(TestId::Run).unwrap();
        machine.start().unwrap();
        assert_eq!(machine.current_state(), Some(TestId::Run));
    }

    #[test]
    fn set_initial_rejects_unknown_state() {
        let log = Log::default();
        let mut machine = probe_machine(&log);
        assert!(matches!(
            machine.set_initial(TestId::Appeal),
            Err(BuildError::UnknownInitialState { .. })
        ));
    }

    #[test]
    fn transition_applies_after_late_update() {
        let log = Log::default();
        let mut machine = probe_machine(&log);
        machine.start().unwrap();

        machine.tick(TickKind::Update, 0.1).unwrap();
        machine.transition(TestId::Run).unwrap();
        assert_eq!(machine.current_state(), Some(TestId::Idle));
        machine.tick(TickKind::Update, 0.1).unwrap();
        machine.tick(TickKind::LateUpdate, 0.1).unwrap();
        machine.tick(TickKind::Update, 0.1).unwrap();

        assert_eq!(machine.current_state(), Some(TestId::Run));
        assert_eq!(
            *log.borrow(),
            vec![
                "Idle:begin",
                "Idle:update@0",
                "Idle:update@0",
                "Idle:end",
                "Run:begin",
                "Run:update@1",
            ]
        );
        assert_eq!(machine.frame_count(), 1);
    }

    #[test]
    fn history_records_applied_transitions() {
        let log = Log::default();
        let mut machine = probe_machine(&log);
        machine.start().unwrap();

        machine.transition(TestId::Run).unwrap();
        machine.run_frame(0.0).unwrap();
        machine.transition(TestId::Idle).unwrap();
        machine.run_frame(0.0).unwrap();

        let history = machine.history();
        assert_eq!(history.len(), 2);
        assert_eq!(
            history.get_path(),
            vec![&TestId::Idle, &TestId::Run, &TestId::Idle]
        );
        assert_eq!(history.last().map(|t| t.frame), Some(1));
    }

    #[test]
    fn history_can_be_disabled() {
        let log = Log::default();
        let mut machine = StateMachine::new(MachineConfig {
            record_history: false,
            ..MachineConfig::default()
        });
        for id in [TestId::Idle, TestId::Run] {
            machine
                .register(Probe {
                    id,
                    log: log.clone(),
                })
                .unwrap();
        }
        machine.start().unwrap();
        machine.transition(TestId::Run).unwrap();
        machine.run_frame(0.0).unwrap();

        assert_eq!(machine.current_state(), Some(TestId::Run));
        assert!(machine.history().is_empty());
    }

    #[test]
    fn typed_initial_state_needs_payload() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut machine: StateMachine<TestId> = StateMachine::default();
        machine.register(Typed { seen: seen.clone() }).unwrap();

        assert!(matches!(
            machine.set_initial(TestId::Appeal),
            Err(BuildError::InitialPayloadMismatch { .. })
        ));
        assert!(matches!(
            machine.start(),
            Err(StartError::MissingInitialPayload { .. })
        ));
    }

    #[test]
    fn failed_start_keeps_registration_open() {
        let log = Log::default();
        let mut machine: StateMachine<TestId> = StateMachine::default();
        assert_eq!(machine.start(), Err(StartError::NoCurrentState));
        assert_eq!(machine.phase(), MachinePhase::Registering);

        machine
            .register(Probe {
                id: TestId::Idle,
                log: log.clone(),
            })
            .unwrap();
        machine.start().unwrap();
        assert_eq!(machine.current_state(), Some(TestId::Idle));
    }

    #[test]
    fn missing_initial_payload_can_be_supplied_after_failure() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut machine: StateMachine<TestId> = StateMachine::default();
        machine.register(Typed { seen: seen.clone() }).unwrap();

        assert!(matches!(
            machine.start(),
            Err(StartError::MissingInitialPayload { .. })
        ));
        assert_eq!(machine.phase(), MachinePhase::Registering);
        assert!(seen.borrow().is_empty());

        machine.set_initial_with(TestId::Appeal, 11).unwrap();
        machine.start().unwrap();
        assert_eq!(*seen.borrow(), vec![11]);
    }

    #[test]
    fn typed_initial_state_receives_payload() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut machine: StateMachine<TestId> = StateMachine::default();
        machine.register(Typed { seen: seen.clone() }).unwrap();
        machine.set_initial_with(TestId::Appeal, 7).unwrap();
        machine.start().unwrap();

        assert_eq!(*seen.borrow(), vec![7]);
    }

    #[test]
    fn request_from_begin_listener_waits_for_next_frame() {
        struct Bouncer;

        impl State<TestId> for Bouncer {
            type Payload = ();

            fn id(&self) -> TestId {
                TestId::Run
            }

            fn initialize(&mut self, ctx: &StateContext<TestId>) {
                let machine = ctx.machine();
                ctx.begin_stream()
                    .subscribe(move |_| machine.transition(TestId::Idle).unwrap());
            }
        }

        let log = Log::default();
        let mut machine = StateMachine::default();
        machine
            .register(Probe {
                id: TestId::Idle,
                log: log.clone(),
            })
            .unwrap();
        machine.register(Bouncer).unwrap();
        machine.start().unwrap();

        machine.transition(TestId::Run).unwrap();
        machine.run_frame(0.0).unwrap();
        assert_eq!(machine.current_state(), Some(TestId::Run));
        assert_eq!(machine.pending_target(), Some(TestId::Idle));

        machine.run_frame(0.0).unwrap();
        assert_eq!(machine.current_state(), Some(TestId::Idle));
    }

    #[test]
    fn dispose_stops_everything() {
        let log = Log::default();
        let mut machine = probe_machine(&log);
        let handle = machine.handle();
        machine.start().unwrap();
        machine.transition(TestId::Run).unwrap();

        machine.dispose();
        assert_eq!(machine.phase(), MachinePhase::Disposed);
        assert_eq!(machine.current_state(), None);
        assert_eq!(handle.transition(TestId::Run), Err(TransitionError::Disposed));
        assert_eq!(
            machine.tick(TickKind::Update, 0.0),
            Err(TransitionError::Disposed)
        );
        assert_eq!(machine.start(), Err(StartError::Disposed));
        assert_eq!(*log.borrow(), vec!["Idle:begin"]);
    }

    #[test]
    fn dropping_machine_detaches_handles() {
        let log = Log::default();
        let machine = probe_machine(&log);
        let handle = machine.handle();
        drop(machine);
        assert_eq!(handle.transition(TestId::Run), Err(TransitionError::Detached));
    }

    #[test]
    fn ticks_before_start_reach_nobody() {
        let count = Rc::new(Cell::new(0));
        struct Counter(Rc<Cell<u32>>);

        impl State<TestId> for Counter {
            type Payload = ();

            fn id(&self) -> TestId {
                TestId::Idle
            }

            fn initialize(&mut self, ctx: &StateContext<TestId>) {
                let count = self.0.clone();
                ctx.update_stream().subscribe(move |_| count.set(count.get() + 1));
            }
        }

        let mut machine = StateMachine::default();
        machine.register(Counter(count.clone())).unwrap();
        machine.initialize();
        machine.run_frame(0.0).unwrap();
        assert_eq!(count.get(), 0);

        machine.start().unwrap();
        machine.run_frame(0.0).unwrap();
        assert_eq!(count.get(), 1);
    }
}
