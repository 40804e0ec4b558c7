//! Hosted simulation of a mote serial transport.
//!
//! Runs one [`OpenSerial`](openserial::OpenSerial) instance against a
//! simulated UART and stack, and exposes the UART over TCP so host tools can
//! talk to it as if it were a board on a serial port.
//!
//! ## Architecture
//!
//! ```text
//!   TCP client ◀──▶ UartBridge ◀──HostLink──▶ SimUart ─┐
//!                       │                              │ TxReady
//!                       └──── RxBytes ────▶ MoteActor ◀┘
//!                                             │  isr_rx / isr_tx / timers
//!                                             ▼
//!                                         OpenSerial ──▶ SimMote
//! ```

pub mod actor;
pub mod bridge;
pub mod config;
pub mod error;
pub mod link;
pub mod reporters;
pub mod sim_mote;
pub mod sim_uart;

pub use actor::{spawn_mote, MoteEvent, MoteHandle, MoteThread};
pub use bridge::UartBridge;
pub use config::{MoteConfig, RunnerConfig};
pub use error::RunnerError;
pub use link::{HostLink, HostPort};
pub use reporters::status_reporters;
pub use sim_mote::{MoteState, SimMote};
pub use sim_uart::SimUart;
