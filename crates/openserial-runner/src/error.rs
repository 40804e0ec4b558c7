//! Error types for the simulated mote.

use openserial::ConfigError;
use thiserror::Error;

/// Errors raised while setting up or running the simulated mote.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// I/O error (config file, socket, thread spawn).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid YAML for [`RunnerConfig`](crate::RunnerConfig).
    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The transport rejected its configuration.
    #[error("invalid transport config: {0}")]
    Config(#[from] ConfigError),

    /// A runner setting is out of range.
    #[error("invalid runner config: {0}")]
    InvalidSetting(String),

    /// The Ctrl-C handler could not be installed.
    #[error("signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// The mote thread is gone.
    #[error("mote actor has stopped")]
    ActorStopped,

    /// The mote thread panicked.
    #[error("mote thread panicked")]
    ThreadPanicked,
}
