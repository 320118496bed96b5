//! Builder for constructing state machines.

use crate::builder::error::BuildError;
use crate::core::StateId;
use crate::machine::transition::PayloadType;
use crate::machine::{MachineConfig, StateMachine};
use crate::state::State;
use std::any::Any;
use std::collections::HashSet;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Install<I> = Box<dyn FnOnce(&mut StateMachine<I>) -> Result<(), BuildError>>;

struct Registration<I: StateId> {
    id: I,
    payload_type: PayloadType,
    install: Install<I>,
}

struct InitialOverride<I: StateId> {
    id: I,
    payload_type: PayloadType,
    payload: Box<dyn Any>,
}

/// Host-side collaborator that registers the full set of states.
///
/// # Example
///
/// ```rust
/// use tickstate::builder::{RegisterStates, StateMachineBuilder};
/// use tickstate::state::{State, StateContext};
/// use tickstate::state_id;
///
/// state_id! {
///     enum Door { Open, Closed }
/// }
///
/// struct Simple(Door);
///
/// impl State<Door> for Simple {
///     type Payload = ();
///     fn id(&self) -> Door { self.0 }
///     fn initialize(&mut self, _ctx: &StateContext<Door>) {}
/// }
///
/// struct DoorStates;
///
/// impl RegisterStates<Door> for DoorStates {
///     fn register_states(self, builder: StateMachineBuilder<Door>) -> StateMachineBuilder<Door> {
///         builder.register(Simple(Door::Closed)).register(Simple(Door::Open))
///     }
/// }
///
/// let machine = StateMachineBuilder::new().register_all(DoorStates).build().unwrap();
/// assert_eq!(machine.current_state(), Some(Door::Closed));
/// ```
pub trait RegisterStates<I: StateId> {
    fn register_states(self, builder: StateMachineBuilder<I>) -> StateMachineBuilder<I>;
}

/// Builder for constructing state machines with a fluent API.
///
/// Registrations are collected and validated together, so a build
/// failure reports every configuration problem at once.
pub struct StateMachineBuilder<I: StateId> {
    config: MachineConfig,
    registrations: Vec<Registration<I>>,
    initial: Option<InitialOverride<I>>,
}

impl<I: StateId> StateMachineBuilder<I> {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: MachineConfig::default(),
            registrations: Vec::new(),
            initial: None,
        }
    }

    /// Replace the machine configuration.
    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the machine right after building it.
    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.config.auto_start = auto_start;
        self
    }

    /// Add a state. The first one added is the initial state unless
    /// [`initial`](Self::initial) says otherwise.
    pub fn register<S: State<I>>(mut self, state: S) -> Self {
        self.registrations.push(Registration {
            id: state.id(),
            payload_type: PayloadType::of::<S::Payload>(),
            install: Box::new(move |machine: &mut StateMachine<I>| machine.register(state)),
        });
        self
    }

    /// Let a host collaborator add its states.
    pub fn register_all<R: RegisterStates<I>>(self, registrar: R) -> Self {
        registrar.register_states(self)
    }

    /// Override the initial state (payload-less states).
    pub fn initial(self, id: I) -> Self {
        self.initial_with(id, ())
    }

    /// Override the initial state, delivering `payload` to its first begin.
    pub fn initial_with<P: 'static>(mut self, id: I, payload: P) -> Self {
        self.initial = Some(InitialOverride {
            id,
            payload_type: PayloadType::of::<P>(),
            payload: Box::new(payload),
        });
        self
    }

    /// Check the configuration, accumulating ALL problems.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<BuildError>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<BuildError>>> = Vec::new();

        if self.registrations.is_empty() {
            checks.push(Validation::fail(BuildError::NoStates));
        }

        let mut seen = HashSet::new();
        for registration in &self.registrations {
            let check = if seen.insert(registration.id) {
                Validation::success(())
            } else {
                Validation::fail(BuildError::DuplicateState {
                    state: registration.id.name().to_string(),
                })
            };
            checks.push(check);
        }

        if let Some(check) = self.validate_initial() {
            checks.push(check);
        }

        Validation::all_vec(checks).map(|_| ())
    }

    fn validate_initial(&self) -> Option<Validation<(), NonEmptyVec<BuildError>>> {
        let (id, found) = match &self.initial {
            Some(initial) => (initial.id, Some(initial.payload_type)),
            None => (self.registrations.first()?.id, None),
        };
        let Some(registration) = self.registrations.iter().find(|r| r.id == id) else {
            return Some(Validation::fail(BuildError::UnknownInitialState {
                state: id.name().to_string(),
            }));
        };
        let expected = registration.payload_type;

        let check = match found {
            Some(found) if found != expected => {
                Validation::fail(BuildError::InitialPayloadMismatch {
                    state: id.name().to_string(),
                    expected: expected.name,
                    found: found.name,
                })
            }
            None if !expected.is_unit() => Validation::fail(BuildError::MissingInitialPayload {
                state: id.name().to_string(),
                expected: expected.name,
            }),
            _ => Validation::success(()),
        };
        Some(check)
    }

    /// Build the state machine, starting it when `auto_start` is set.
    ///
    /// Returns [`BuildError::Invalid`] listing every validation failure.
    pub fn build(self) -> Result<StateMachine<I>, BuildError> {
        if let Validation::Failure(errors) = self.validate() {
            return Err(BuildError::Invalid(errors.iter().cloned().collect()));
        }

        let mut machine = StateMachine::new(self.config.clone());
        for registration in self.registrations {
            (registration.install)(&mut machine)?;
        }
        if let Some(initial) = self.initial {
            machine.set_initial_boxed(initial.id, initial.payload)?;
        }
        if self.config.auto_start {
            machine.start()?;
        }
        Ok(machine)
    }
}

impl<I: StateId> Default for StateMachineBuilder<I> {
    fn default() -> Self {
        Self::new()
    }
}
