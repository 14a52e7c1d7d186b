//! Engine error types.

use thiserror::Error;

/// Errors reported by the engine.
///
/// Rejected transitions are normally swallowed by [`crate::fsm::StateMachine::enter`];
/// the variant exists for callers that use `try_enter` and want the reason.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("{machine}: no transition from '{from}' to '{to}'")]
    InvalidTransition {
        machine: &'static str,
        from: String,
        to: String,
    },

    /// No difficulty entry for this level (no further levels configured)
    #[error("no difficulty configured for level {level} (table covers 1..={max_level})")]
    UnknownLevel { level: u32, max_level: u32 },

    #[error("invalid difficulty table: {0}")]
    InvalidDifficulty(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings parse failed: {0}")]
    Config(#[from] serde_json::Error),
}
