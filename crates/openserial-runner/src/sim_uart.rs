//! Simulated UART.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use openserial::Uart;
use tracing::{debug, trace, warn};

use crate::actor::{MoteEvent, MoteHandle};
use crate::link::HostLink;

/// UART whose line is a [`HostLink`].
///
/// Each written byte raises a transmit-ready event one byte time later, so
/// the transport drains at the configured baud rate.
#[derive(Debug)]
pub struct SimUart {
    link: HostLink,
    events: MoteHandle,
    byte_time: Duration,
    rx_latch: AtomicU8,
}

impl SimUart {
    /// UART on `link` that signals completion through `events`.
    pub fn new(link: HostLink, events: MoteHandle, byte_time: Duration) -> Self {
        SimUart {
            link,
            events,
            byte_time,
            rx_latch: AtomicU8::new(0),
        }
    }

    /// Put a received byte in the data register before the receive interrupt.
    pub fn latch_rx(&self, byte: u8) {
        self.rx_latch.store(byte, Ordering::Relaxed);
    }

    /// Time one byte occupies the line.
    pub fn byte_time(&self) -> Duration {
        self.byte_time
    }

    /// Level of the flow-control line.
    pub fn cts(&self) -> bool {
        self.link.cts()
    }
}

impl Uart for SimUart {
    fn write_byte(&self, byte: u8) {
        if !self.link.send(vec![byte]) {
            trace!("SimUart: No host attached, dropped {:#04x}", byte);
        }
        if self.events.schedule(self.byte_time, MoteEvent::TxReady).is_err() {
            warn!("SimUart: Actor stopped, transmit-ready lost");
        }
    }

    fn set_cts(&self, clear_to_send: bool) {
        debug!("SimUart: CTS {}", if clear_to_send { "high" } else { "low" });
        self.link.set_cts(clear_to_send);
    }

    fn read_byte(&self) -> u8 {
        self.rx_latch.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_schedules_tx_ready() {
        let (link, mut port) = HostLink::new_pair();
        let (events, inbox) = MoteHandle::channel();
        let uart = SimUart::new(link, events, Duration::from_micros(87));

        port.set_connected(true);
        uart.write_byte(0x7E);
        assert_eq!(port.try_recv(), Some(vec![0x7E]));
        let envelope = inbox.try_recv().unwrap();
        assert!(format!("{:?}", envelope).contains("TxReady"));
    }

    #[test]
    fn test_write_without_host_still_completes() {
        let (link, mut port) = HostLink::new_pair();
        let (events, inbox) = MoteHandle::channel();
        let uart = SimUart::new(link, events, Duration::ZERO);

        uart.write_byte(0x42);
        assert_eq!(port.try_recv(), None);
        assert!(inbox.try_recv().is_ok());
    }

    #[test]
    fn test_rx_latch_and_cts() {
        let (link, port) = HostLink::new_pair();
        let (events, _inbox) = MoteHandle::channel();
        let uart = SimUart::new(link, events, Duration::ZERO);

        uart.latch_rx(0x51);
        assert_eq!(uart.read_byte(), 0x51);

        uart.set_cts(false);
        assert!(!uart.cts());
        assert!(!port.cts());
    }
}
