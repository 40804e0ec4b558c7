//! Transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default delay between a critical report and the board reset.
pub const DEFAULT_CRITICAL_RESET_DELAY_MS: u64 = 10_000;

/// Tunables of an [`OpenSerial`](crate::OpenSerial) instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Delay before the board is reset after a critical report.
    pub critical_reset_delay_ms: u64,
    /// Number of externally registered command handlers kept at once.
    pub command_slots: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            critical_reset_delay_ms: DEFAULT_CRITICAL_RESET_DELAY_MS,
            command_slots: 1,
        }
    }
}

impl SerialConfig {
    /// Check the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_slots == 0 {
            return Err(ConfigError::NoCommandSlots);
        }
        if self.critical_reset_delay_ms == 0 {
            return Err(ConfigError::ZeroResetDelay);
        }
        Ok(())
    }

    /// Critical reset delay as a [`Duration`].
    pub fn critical_reset_delay(&self) -> Duration {
        Duration::from_millis(self.critical_reset_delay_ms)
    }
}
