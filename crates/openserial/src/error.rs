//! Error types for the serial transport.

use thiserror::Error;

/// Rejected transport configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The command table needs at least one slot.
    #[error("command_slots must be at least 1")]
    NoCommandSlots,

    /// The critical reset delay must be non-zero.
    #[error("critical_reset_delay_ms must be greater than zero")]
    ZeroResetDelay,
}
