//! Transport counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the transport counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerialStats {
    /// Frames accepted into the output buffer.
    pub frames_sent: u64,
    /// Bytes handed to the UART.
    pub bytes_drained: u64,
    /// Frames dropped because the output buffer was full.
    pub output_drops: u64,
    /// Inbound frames dispatched.
    pub frames_received: u64,
    /// Inbound frames rejected for a bad CRC or no content.
    pub crc_failures: u64,
    /// Inbound frames larger than the input buffer.
    pub input_overflows: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub frames_sent: AtomicU64,
    pub bytes_drained: AtomicU64,
    pub output_drops: AtomicU64,
    pub frames_received: AtomicU64,
    pub crc_failures: AtomicU64,
    pub input_overflows: AtomicU64,
}

impl StatsCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SerialStats {
        SerialStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_drained: self.bytes_drained.load(Ordering::Relaxed),
            output_drops: self.output_drops.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            crc_failures: self.crc_failures.load(Ordering::Relaxed),
            input_overflows: self.input_overflows.load(Ordering::Relaxed),
        }
    }
}
