//! Machine configuration.

use serde::{Deserialize, Serialize};

/// Tunables for a [`StateMachine`](super::StateMachine).
///
/// Deserializable with every field optional, so hosts can embed it in
/// their own settings files.
///
/// # Example
///
/// ```rust
/// use tickstate::machine::MachineConfig;
///
/// let config: MachineConfig = serde_json::from_str(r#"{ "auto_start": false }"#).unwrap();
/// assert!(!config.auto_start);
/// assert!(config.record_history);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Start the machine as soon as the builder has built it.
    pub auto_start: bool,
    /// Record applied transitions in the machine's history.
    pub record_history: bool,
    /// Maximum number of history entries kept; `None` keeps everything.
    pub history_limit: Option<usize>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            record_history: true,
            history_limit: Some(256),
        }
    }
}
