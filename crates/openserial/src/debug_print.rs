//! Periodic status reporting.
//!
//! Each tick gives the reporters a chance, in a fixed order, to send one
//! status frame. The counter advances by one per tick; a reporter with
//! nothing to say passes the turn to the next one.

use openserial_protocol::STATUS_OUTBUFFERINDEXES;
use parking_lot::Mutex;

use crate::OpenSerial;

/// Source of one status element.
pub trait StatusReporter: Send + Sync {
    /// Emit a status frame through `serial`, or return `false` when there is
    /// nothing to report.
    fn report(&self, serial: &OpenSerial) -> bool;
}

impl<F> StatusReporter for F
where
    F: Fn(&OpenSerial) -> bool + Send + Sync,
{
    fn report(&self, serial: &OpenSerial) -> bool {
        self(serial)
    }
}

/// Round-robin over an ordered list of reporters.
pub struct DebugScheduler {
    reporters: Vec<Box<dyn StatusReporter>>,
    counter: Mutex<usize>,
}

impl DebugScheduler {
    /// Scheduler over `reporters`, tried in list order.
    pub fn new(reporters: Vec<Box<dyn StatusReporter>>) -> Self {
        DebugScheduler {
            reporters,
            counter: Mutex::new(0),
        }
    }

    /// Number of reporters.
    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    /// Whether there are no reporters.
    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    /// Current counter position.
    pub fn counter(&self) -> usize {
        *self.counter.lock()
    }

    /// Put the counter back to the first reporter.
    pub fn reset(&self) {
        *self.counter.lock() = 0;
    }

    /// Advance the counter and run reporters from there until one produces.
    ///
    /// Returns the index of the reporter that produced a frame.
    pub fn tick(&self, serial: &OpenSerial) -> Option<usize> {
        let count = self.reporters.len();
        if count == 0 {
            return None;
        }
        let start = {
            let mut counter = self.counter.lock();
            *counter = (*counter + 1) % count;
            *counter
        };

        // Reporters print, so the counter lock is not held across them
        let produced = (start..count).find(|&i| self.reporters[i].report(serial));
        if produced.is_none() {
            *self.counter.lock() = 0;
        }
        produced
    }
}

/// Reports the output ring's write and read indexes.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutBufferIndexesReporter;

impl StatusReporter for OutBufferIndexesReporter {
    fn report(&self, serial: &OpenSerial) -> bool {
        let (write, read) = serial.output_indexes();
        let mut payload = [0u8; 4];
        payload[..2].copy_from_slice(&(write as u16).to_le_bytes());
        payload[2..].copy_from_slice(&(read as u16).to_le_bytes());
        serial.print_status(STATUS_OUTBUFFERINDEXES, &payload);
        true
    }
}
