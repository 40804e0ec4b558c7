//! Runner configuration.
//!
//! Loaded from YAML; every field has a default so an empty file (or no file)
//! gives a working mote. Command-line flags override single fields.

use std::path::Path;
use std::time::Duration;

use openserial::SerialConfig;
use serde::{Deserialize, Serialize};

use crate::error::RunnerError;

/// Bits on the wire per byte: start, 8 data, stop.
const BITS_PER_BYTE: u64 = 10;

/// Top-level configuration of the simulated mote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// 16-bit short address.
    pub device_id: u16,
    /// TCP port the UART is exposed on.
    pub port: u16,
    /// UART baud rate used to pace bytes; 0 sends as fast as possible.
    pub baud: u32,
    /// Period of the debug status tick in milliseconds; 0 disables it.
    pub debug_period_ms: u64,
    /// Transport settings.
    pub serial: SerialConfig,
    /// Initial simulated stack state.
    pub mote: MoteConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            device_id: 0x0001,
            port: 7000,
            baud: 115_200,
            debug_period_ms: 1000,
            serial: SerialConfig::default(),
            mote: MoteConfig::default(),
        }
    }
}

/// Values the simulated stack starts from (and returns to on reset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoteConfig {
    /// Whether the mote starts synchronized.
    pub is_sync: bool,
    /// Whether the mote starts as DAG root.
    pub is_root: bool,
    /// PAN identifier.
    pub pan_id: u16,
    /// Routing rank.
    pub dag_rank: u16,
    /// Single channel, 0 for hopping.
    pub channel: u8,
    /// Keep-alive period in slots.
    pub ka_period: u16,
    /// Short addresses of the neighbors the mote hears.
    pub neighbors: Vec<u16>,
}

impl Default for MoteConfig {
    fn default() -> Self {
        MoteConfig {
            is_sync: true,
            is_root: false,
            pan_id: 0xcafe,
            dag_rank: 512,
            channel: 0,
            ka_period: 3000,
            neighbors: Vec::new(),
        }
    }
}

impl RunnerConfig {
    /// Load a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse YAML text. An empty document yields the defaults.
    pub fn from_yaml(text: &str) -> Result<Self, RunnerError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Check every setting is usable.
    pub fn validate(&self) -> Result<(), RunnerError> {
        self.serial.validate()?;
        if self.port == 0 {
            return Err(RunnerError::InvalidSetting("port must be non-zero".into()));
        }
        Ok(())
    }

    /// Time one byte occupies the line, zero when unpaced.
    pub fn byte_time(&self) -> Duration {
        if self.baud == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(BITS_PER_BYTE * 1_000_000_000 / self.baud as u64)
        }
    }

    /// Debug tick period, `None` when disabled.
    pub fn debug_period(&self) -> Option<Duration> {
        (self.debug_period_ms > 0).then(|| Duration::from_millis(self.debug_period_ms))
    }

    /// Short address as sent on the wire (high byte first).
    pub fn short_id(&self) -> [u8; 2] {
        self.device_id.to_be_bytes()
    }
}
