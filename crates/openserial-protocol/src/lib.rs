//! Mote Serial Protocol
//!
//! This crate provides the wire format spoken between a mesh mote and the host
//! it is attached to over a UART. Every message travels inside an HDLC-style
//! frame: a flag byte, the byte-stuffed content, a 16-bit CRC and a closing
//! flag byte.
//!
//! # Protocol Overview
//!
//! The first content byte of a frame identifies it:
//!
//! - **Reports** (mote → host): status, info, error, critical, data, sniffed
//!   packets and printf text, each starting with a `SERFRAME_MOTE2PC_*` tag
//! - **Commands** (host → mote): set-root, reset, inject-data, echo and the
//!   generic stack command, each starting with a `SERFRAME_PC2MOTE_*` byte
//!
//! ```text
//! +------+---------------------------+--------+--------+------+
//! | 0x7E | content (escaped)         | crc_lo | crc_hi | 0x7E |
//! +------+---------------------------+--------+--------+------+
//! ```
//!
//! # Example
//!
//! ```rust
//! use openserial_protocol::{HdlcCodec, HostCommand, hdlc_frame};
//!
//! let wire = hdlc_frame(&HostCommand::TriggerEcho(vec![0x41, 0x42]).encode());
//!
//! let mut codec = HdlcCodec::new();
//! codec.push(&wire);
//! let content = codec.decode().expect("complete frame");
//! assert_eq!(HostCommand::decode(&content).unwrap(), HostCommand::TriggerEcho(vec![0x41, 0x42]));
//! ```

mod commands;
mod constants;
mod crc;
mod error;
mod hdlc;
mod reports;

pub use commands::*;
pub use constants::*;
pub use crc::*;
pub use error::*;
pub use hdlc::*;
pub use reports::*;
