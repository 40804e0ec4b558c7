//! Output channel and flow control.
//!
//! Encoded frames are appended to a fixed ring; the transmit path drains it
//! one byte at a time. At most one byte is ever in flight on the UART.
//!
//! The ring keeps one slot free so that `write == read` always means empty.
//! A frame that does not fit is dropped whole (newest loses): bytes are
//! staged past the committed write index and only published when the closing
//! flag has been written.

use openserial_protocol::{ByteSink, HdlcEncoder, SERIAL_OUTPUT_BUFFER_SIZE};

use crate::services::Uart;

const N: usize = SERIAL_OUTPUT_BUFFER_SIZE;

/// What one drain step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStep {
    /// The flow-control line was updated; no byte sent.
    Signalled,
    /// A byte was handed to the UART.
    Sent,
    /// Inhibited, nothing sent.
    Inhibited,
    /// Buffer empty, nothing sent.
    Empty,
    /// A byte is already in flight.
    Busy,
}

/// Output ring, drain state and flow-control flags.
#[derive(Debug)]
pub struct OutputChannel {
    buf: [u8; N],
    idx_w: usize,
    idx_r: usize,
    busy_flushing: bool,
    inhibited: bool,
    cts_changed: bool,
    encoder: HdlcEncoder,
    staging: usize,
    staging_overflowed: bool,
    dropped_frames: u32,
}

impl Default for OutputChannel {
    fn default() -> Self {
        Self::new()
    }
}

struct RingWriter<'a> {
    buf: &'a mut [u8; N],
    cursor: &'a mut usize,
    idx_r: usize,
    overflowed: &'a mut bool,
}

impl ByteSink for RingWriter<'_> {
    fn put_byte(&mut self, byte: u8) {
        if *self.overflowed {
            return;
        }
        let next = (*self.cursor + 1) % N;
        if next == self.idx_r {
            *self.overflowed = true;
            return;
        }
        self.buf[*self.cursor] = byte;
        *self.cursor = next;
    }
}

impl OutputChannel {
    /// Create an empty, uninhibited channel.
    pub fn new() -> Self {
        OutputChannel {
            buf: [0u8; N],
            idx_w: 0,
            idx_r: 0,
            busy_flushing: false,
            inhibited: false,
            cts_changed: false,
            encoder: HdlcEncoder::new(),
            staging: 0,
            staging_overflowed: false,
            dropped_frames: 0,
        }
    }

    fn with_writer(&mut self, f: impl FnOnce(&mut HdlcEncoder, &mut RingWriter<'_>)) {
        let OutputChannel {
            buf,
            idx_r,
            encoder,
            staging,
            staging_overflowed,
            ..
        } = self;
        let mut writer = RingWriter {
            buf,
            cursor: staging,
            idx_r: *idx_r,
            overflowed: staging_overflowed,
        };
        f(encoder, &mut writer);
    }

    // ===== encoding

    /// Start a frame: reset the CRC and stage the opening flag.
    pub fn open_frame(&mut self) {
        self.staging = self.idx_w;
        self.staging_overflowed = false;
        self.with_writer(|enc, w| enc.open(w));
    }

    /// Stage one content byte.
    pub fn write_byte(&mut self, byte: u8) {
        self.with_writer(|enc, w| enc.write(w, byte));
    }

    /// Stage a run of content bytes.
    pub fn write_all(&mut self, bytes: &[u8]) {
        self.with_writer(|enc, w| enc.write_all(w, bytes));
    }

    /// Stage the CRC and closing flag, then publish the frame.
    ///
    /// Returns `false` if the frame did not fit and was dropped.
    pub fn close_frame(&mut self) -> bool {
        self.with_writer(|enc, w| enc.close(w));
        if self.staging_overflowed {
            self.staging = self.idx_w;
            self.dropped_frames = self.dropped_frames.saturating_add(1);
            return false;
        }
        self.idx_w = self.staging;
        true
    }

    /// Take the count of frames dropped since the last call.
    pub fn take_dropped_frames(&mut self) -> u32 {
        std::mem::take(&mut self.dropped_frames)
    }

    // ===== draining

    /// Mainline flush attempt.
    ///
    /// A pending flow-control change is signalled first and consumes the
    /// attempt; otherwise one byte is sent unless inhibited or empty.
    pub fn flush(&mut self, uart: &dyn Uart) -> DrainStep {
        if self.busy_flushing {
            return DrainStep::Busy;
        }
        if self.cts_changed {
            uart.set_cts(!self.inhibited);
            self.cts_changed = false;
            DrainStep::Signalled
        } else if self.inhibited {
            DrainStep::Inhibited
        } else if self.send_next(uart) {
            DrainStep::Sent
        } else {
            DrainStep::Empty
        }
    }

    /// Transmit-ready handler: the previous byte has left the UART.
    ///
    /// A pending flow-control change is signalled before anything else; the
    /// step then either sends the next byte or stops draining.
    pub fn on_tx_ready(&mut self, uart: &dyn Uart) -> DrainStep {
        let signalled = if self.cts_changed {
            uart.set_cts(!self.inhibited);
            self.cts_changed = false;
            true
        } else {
            false
        };

        if self.inhibited {
            self.busy_flushing = false;
            return if signalled { DrainStep::Signalled } else { DrainStep::Inhibited };
        }
        if self.send_next(uart) {
            DrainStep::Sent
        } else {
            self.busy_flushing = false;
            if signalled {
                DrainStep::Signalled
            } else {
                DrainStep::Empty
            }
        }
    }

    fn send_next(&mut self, uart: &dyn Uart) -> bool {
        if self.idx_w == self.idx_r {
            return false;
        }
        uart.write_byte(self.buf[self.idx_r]);
        self.idx_r = (self.idx_r + 1) % N;
        self.busy_flushing = true;
        true
    }

    // ===== flow control

    /// Ask the peer to stop sending and stop draining.
    pub fn inhibit_start(&mut self) {
        self.inhibited = true;
        self.cts_changed = true;
    }

    /// Let the peer send again and allow draining.
    pub fn inhibit_stop(&mut self) {
        self.inhibited = false;
        self.cts_changed = true;
    }

    // ===== inspection

    /// Whether there is nothing left to send.
    pub fn is_empty(&self) -> bool {
        self.idx_w == self.idx_r
    }

    /// Number of bytes waiting to be sent.
    pub fn pending(&self) -> usize {
        (self.idx_w + N - self.idx_r) % N
    }

    /// Largest number of bytes the ring can hold.
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Write and read indexes.
    pub fn indexes(&self) -> (usize, usize) {
        (self.idx_w, self.idx_r)
    }

    /// Whether draining is inhibited.
    pub fn is_inhibited(&self) -> bool {
        self.inhibited
    }

    /// Whether the flow-control line still has to be updated.
    pub fn cts_changed(&self) -> bool {
        self.cts_changed
    }

    /// Whether a byte is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy_flushing
    }
}
