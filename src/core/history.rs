//! State transition history tracking.
//!
//! Every transition applied by the machine is appended to a
//! [`StateHistory`], optionally capped to the most recent entries.
//! Histories are serializable for diagnostics and test assertions.

use super::id::StateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single applied transition.
///
/// # Example
///
/// ```rust
/// use tickstate::core::StateTransition;
/// use tickstate::state_id;
/// use chrono::Utc;
///
/// state_id! {
///     enum Phase { Idle, Run }
/// }
///
/// let transition = StateTransition {
///     from: Phase::Idle,
///     to: Phase::Run,
///     frame: 3,
///     timestamp: Utc::now(),
/// };
/// assert_eq!(transition.to, Phase::Run);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<I: StateId> {
    /// The state that ended
    pub from: I,
    /// The state that began
    pub to: I,
    /// Frame in which the transition was applied
    pub frame: u64,
    /// Wall-clock time of the application step
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of applied transitions.
///
/// When a limit is set, the oldest transitions are dropped once the
/// history grows past it.
///
/// # Example
///
/// ```rust
/// use tickstate::core::{StateHistory, StateTransition};
/// use tickstate::state_id;
/// use chrono::Utc;
///
/// state_id! {
///     enum Step { A, B, C }
/// }
///
/// let mut history = StateHistory::new();
/// history.record(StateTransition { from: Step::A, to: Step::B, frame: 1, timestamp: Utc::now() });
/// history.record(StateTransition { from: Step::B, to: Step::C, frame: 2, timestamp: Utc::now() });
///
/// assert_eq!(history.get_path(), vec![&Step::A, &Step::B, &Step::C]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<I: StateId> {
    transitions: VecDeque<StateTransition<I>>,
    #[serde(default)]
    limit: Option<usize>,
}

impl<I: StateId> Default for StateHistory<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: StateId> StateHistory<I> {
    /// Create a new, unbounded history.
    pub fn new() -> Self {
        Self {
            transitions: VecDeque::new(),
            limit: None,
        }
    }

    /// Create a history keeping at most `limit` transitions.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            transitions: VecDeque::with_capacity(limit.min(64)),
            limit: Some(limit),
        }
    }

    /// Append a transition, evicting the oldest one past the limit.
    pub fn record(&mut self, transition: StateTransition<I>) {
        self.transitions.push_back(transition);
        if let Some(limit) = self.limit {
            while self.transitions.len() > limit {
                self.transitions.pop_front();
            }
        }
    }

    /// Get the path of states traversed.
    ///
    /// Returns the `from` state of the oldest retained transition, then
    /// the `to` state of each transition.
    pub fn get_path(&self) -> Vec<&I> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.front() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Wall-clock time between the first and last retained transitions.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.front()?, self.transitions.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    /// Most recent transition.
    pub fn last(&self) -> Option<&StateTransition<I>> {
        self.transitions.back()
    }

    /// Iterate retained transitions, oldest first.
    pub fn transitions(&self) -> impl Iterator<Item = &StateTransition<I>> {
        self.transitions.iter()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}
