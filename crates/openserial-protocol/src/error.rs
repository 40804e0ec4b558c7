//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when decoding protocol messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is too short to be valid.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Unknown mote → host frame tag.
    #[error("unknown frame tag: 0x{0:02X}")]
    UnknownTag(u8),

    /// Unknown stack command identifier.
    #[error("unknown stack command: 0x{0:02X}")]
    UnknownCommand(u8),

    /// Declared parameter length does not match the command.
    #[error("invalid parameter length for command 0x{command:02X}: {len}")]
    InvalidParamLength {
        /// Command identifier.
        command: u8,
        /// Declared length.
        len: u8,
    },

    /// Parameter value out of range (e.g. a boolean that is neither 0 nor 1).
    #[error("invalid parameter value for command 0x{command:02X}: {value}")]
    InvalidParamValue {
        /// Command identifier.
        command: u8,
        /// Offending value.
        value: u8,
    },

    /// Frame content failed its CRC check.
    #[error("bad frame CRC")]
    BadCrc,
}
