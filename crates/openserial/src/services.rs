//! Interfaces to the rest of the mote.
//!
//! The transport owns none of the hardware or stack layers it talks to. The
//! UART primitive is a [`Uart`]; everything else (identity, time, LEDs, board,
//! timers and the stack layers commands are forwarded to) is a
//! [`MoteServices`].

use std::time::Duration;

use openserial_protocol::{StackCommand, ADDR_16B_LEN, ASN_LEN};

/// One-shot callback run by [`MoteServices::start_oneshot`].
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Byte-level UART primitive.
///
/// Implementations must not call back into the transport from `write_byte`
/// or `set_cts`: completion of a byte is signalled later, through
/// [`OpenSerial::isr_tx`](crate::OpenSerial::isr_tx), the way a transmit
/// interrupt fires after the byte has left the shift register.
pub trait Uart: Send + Sync {
    /// Start sending one byte. Never blocks.
    fn write_byte(&self, byte: u8);

    /// Drive the outbound flow-control line: `true` lets the peer send.
    fn set_cts(&self, clear_to_send: bool);

    /// Byte that raised the last receive interrupt.
    fn read_byte(&self) -> u8;

    /// Unmask the UART interrupts once the transport is ready.
    fn enable_interrupts(&self) {}
}

/// Mote collaborators used by the transport.
pub trait MoteServices: Send + Sync {
    // ----- identity and time -----

    /// 16-bit short address of this mote.
    fn my_short_id(&self) -> [u8; ADDR_16B_LEN];

    /// Current absolute slot number.
    fn asn(&self) -> [u8; ASN_LEN];

    // ----- indicators -----

    /// Toggle the error LED.
    fn error_led_toggle(&self) {}

    /// Blink the error LED.
    fn error_led_blink(&self) {}

    // ----- board and timers -----

    /// Reset the whole board.
    fn board_reset(&self);

    /// Run `callback` once after `delay`.
    fn start_oneshot(&self, delay: Duration, callback: TimerCallback);

    // ----- stack layers -----

    /// Toggle the DAG-root role.
    fn trigger_about_root(&self) {}

    /// Hand a host packet to the bridge for injection into the mesh.
    fn bridge_data(&self, _payload: &[u8]) {}

    /// Apply a stack configuration command.
    fn apply_command(&self, _command: StackCommand) {}
}
