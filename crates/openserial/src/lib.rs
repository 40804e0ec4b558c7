//! Mote Serial Transport
//!
//! The mote side of the host link: turns one UART into a framed,
//! CRC-protected, flow-controlled channel to the host.
//!
//! # Architecture
//!
//! ```text
//!   stack layers ──print_*──▶ OutputChannel ──isr_tx──▶ UART ──▶ host
//!                                  ▲
//!                       inhibit_start/stop (CTS)
//!
//!   host ──▶ UART ──isr_rx──▶ InputAssembler ──▶ dispatch ──▶ MoteServices
//!                                                   └──────▶ registered handlers
//! ```
//!
//! - [`OpenSerial`] owns all state; share it through an `Arc` between the
//!   mainline and the interrupt entry points.
//! - [`Uart`] and [`MoteServices`] are the collaborators it drives.
//! - [`StatusReporter`]s are polled by [`OpenSerial::trigger_debug_print`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use parking_lot::Mutex;
//! use openserial::{MoteServices, OpenSerial, SerialConfig, TimerCallback, Uart};
//!
//! #[derive(Default)]
//! struct LoopUart(Mutex<Vec<u8>>);
//!
//! impl Uart for LoopUart {
//!     fn write_byte(&self, byte: u8) { self.0.lock().push(byte); }
//!     fn set_cts(&self, _clear_to_send: bool) {}
//!     fn read_byte(&self) -> u8 { 0 }
//! }
//!
//! struct Mote;
//!
//! impl MoteServices for Mote {
//!     fn my_short_id(&self) -> [u8; 2] { [0x10, 0x20] }
//!     fn asn(&self) -> [u8; 5] { [0; 5] }
//!     fn board_reset(&self) {}
//!     fn start_oneshot(&self, _delay: Duration, _callback: TimerCallback) {}
//! }
//!
//! let uart = Arc::new(LoopUart::default());
//! let serial = OpenSerial::new(SerialConfig::default(), uart.clone(), Arc::new(Mote), vec![])
//!     .unwrap();
//!
//! serial.print_status(7, &[0x01, 0x02]);
//! while uart.0.lock().len() < 10 {
//!     serial.isr_tx();
//! }
//! assert_eq!(uart.0.lock()[..5], [0x7E, b'S', 0x10, 0x20, 0x07]);
//! ```

mod config;
mod debug_print;
mod dispatch;
mod error;
mod input;
mod output;
mod report;
mod serial;
mod services;
mod stats;

pub use config::{SerialConfig, DEFAULT_CRITICAL_RESET_DELAY_MS};
pub use debug_print::{DebugScheduler, OutBufferIndexesReporter, StatusReporter};
pub use dispatch::{CommandHandler, CommandTable};
pub use error::ConfigError;
pub use input::{InputAssembler, RxEvent};
pub use output::{DrainStep, OutputChannel};
pub use serial::OpenSerial;
pub use services::{MoteServices, TimerCallback, Uart};
pub use stats::SerialStats;
