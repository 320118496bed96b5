//! State identity trait.
//!
//! Every registered state is keyed by a value implementing [`StateId`].
//! Identities are usually plain enums, which gives exhaustive matching
//! wherever a host dispatches on the active state.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

/// Unique key of a registered state.
///
/// One state instance may be registered per identity. The same value is
/// used as the registry key and as the target selector of a transition.
///
/// # Required Traits
///
/// - `Copy` + `Eq` + `Hash`: identities are registry keys
/// - `Debug`: identities show up in diagnostics
/// - `Serialize` + `DeserializeOwned`: transition history is serializable
///
/// # Example
///
/// ```rust
/// use tickstate::core::StateId;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Player {
///     Idle,
///     Run,
/// }
///
/// impl StateId for Player {
///     fn name(&self) -> &str {
///         match self {
///             Self::Idle => "Idle",
///             Self::Run => "Run",
///         }
///     }
/// }
///
/// assert_eq!(Player::Run.name(), "Run");
/// ```
pub trait StateId:
    Copy + Eq + Hash + Debug + Serialize + DeserializeOwned + 'static
{
    /// Get the identity's name for display/logging.
    fn name(&self) -> &str;
}
