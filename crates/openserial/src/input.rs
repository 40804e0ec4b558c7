//! Receive-side frame assembly.

use openserial_protocol::{HdlcDecoder, HDLC_FLAG, SERIAL_INPUT_BUFFER_SIZE};

/// Outcome of feeding one received byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    /// Nothing to act on yet.
    None,
    /// A frame closed with a good CRC; its content is in the buffer.
    FrameReady,
    /// The frame outgrew the buffer and was discarded.
    Overflow {
        /// Fill level when the overflow was detected.
        fill: usize,
    },
    /// A frame closed empty or with a bad CRC.
    InvalidFrame,
}

/// Reassembles flag-delimited frames from the raw receive stream.
#[derive(Debug)]
pub struct InputAssembler {
    decoder: HdlcDecoder<SERIAL_INPUT_BUFFER_SIZE>,
    busy_receiving: bool,
    last_rx_byte: u8,
}

impl Default for InputAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl InputAssembler {
    /// Create an assembler waiting for a frame start.
    pub fn new() -> Self {
        InputAssembler {
            decoder: HdlcDecoder::new(),
            // A frame may start on the very first byte
            last_rx_byte: HDLC_FLAG,
            busy_receiving: false,
        }
    }

    /// Feed one raw byte from the UART.
    ///
    /// A frame starts on the first non-flag byte after a flag and ends on the
    /// next flag. After [`RxEvent::FrameReady`] the content stays readable
    /// until [`finish_frame`](Self::finish_frame).
    pub fn receive(&mut self, byte: u8) -> RxEvent {
        let event = if !self.busy_receiving {
            if self.last_rx_byte == HDLC_FLAG && byte != HDLC_FLAG {
                self.busy_receiving = true;
                self.decoder.open();
                self.write(byte)
            } else {
                RxEvent::None
            }
        } else if byte != HDLC_FLAG {
            self.write(byte)
        } else {
            self.busy_receiving = false;
            if self.decoder.close() == 0 {
                RxEvent::InvalidFrame
            } else {
                RxEvent::FrameReady
            }
        };
        self.last_rx_byte = byte;
        event
    }

    fn write(&mut self, byte: u8) -> RxEvent {
        let stored = self.decoder.decode_byte(byte);
        let fill = self.decoder.fill_level();
        if !stored || fill + 1 > self.decoder.capacity() {
            self.decoder.reset();
            self.busy_receiving = false;
            RxEvent::Overflow { fill }
        } else {
            RxEvent::None
        }
    }

    /// Release the buffer after the completed frame was handled.
    pub fn finish_frame(&mut self) {
        self.decoder.reset();
    }

    /// Content of the current frame (command byte first).
    pub fn frame(&self) -> &[u8] {
        self.decoder.content()
    }

    /// Bytes held in the buffer.
    pub fn fill_level(&self) -> usize {
        self.decoder.fill_level()
    }

    /// Whether a frame is being assembled.
    pub fn is_receiving(&self) -> bool {
        self.busy_receiving
    }

    /// Drop any partial frame and wait for the next start.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openserial_protocol::hdlc_frame;

    fn feed(asm: &mut InputAssembler, bytes: &[u8]) -> Vec<RxEvent> {
        bytes
            .iter()
            .map(|b| asm.receive(*b))
            .filter(|e| *e != RxEvent::None)
            .collect()
    }

    #[test]
    fn test_assembles_frame() {
        let mut asm = InputAssembler::new();
        let events = feed(&mut asm, &hdlc_frame(&[b'S', 0x41, 0x7E, 0x7D]));
        assert_eq!(events, vec![RxEvent::FrameReady]);
        assert_eq!(asm.frame(), &[b'S', 0x41, 0x7E, 0x7D]);

        asm.finish_frame();
        assert_eq!(asm.fill_level(), 0);
        assert!(!asm.is_receiving());
    }

    #[test]
    fn test_back_to_back_flags_open_nothing() {
        let mut asm = InputAssembler::new();
        assert!(feed(&mut asm, &[HDLC_FLAG, HDLC_FLAG, HDLC_FLAG]).is_empty());
        assert!(!asm.is_receiving());
    }

    #[test]
    fn test_closing_flag_can_open_next_frame() {
        let mut asm = InputAssembler::new();
        asm.receive(HDLC_FLAG);
        asm.receive(0x01);
        asm.receive(HDLC_FLAG);
        // Closing flag of the garbage frame also starts the next one
        let events = feed(&mut asm, &hdlc_frame(&[b'R'])[1..]);
        assert_eq!(events, vec![RxEvent::FrameReady]);
        assert_eq!(asm.frame(), &[b'R']);
    }

    #[test]
    fn test_bad_crc_is_invalid() {
        let mut asm = InputAssembler::new();
        let mut wire = hdlc_frame(&[b'S', 0x01, 0x02]);
        wire[2] ^= 0x04;
        assert_eq!(feed(&mut asm, &wire), vec![RxEvent::InvalidFrame]);
        assert_eq!(asm.fill_level(), 0);
    }

    #[test]
    fn test_stray_flag_cuts_frame() {
        let mut asm = InputAssembler::new();
        let events = feed(&mut asm, &[HDLC_FLAG, b'S', 0x01, HDLC_FLAG]);
        assert_eq!(events, vec![RxEvent::InvalidFrame]);
    }

    #[test]
    fn test_overflow_reported_once_then_resumes() {
        let mut asm = InputAssembler::new();
        let mut wire = vec![HDLC_FLAG];
        wire.extend(std::iter::repeat(0x11).take(SERIAL_INPUT_BUFFER_SIZE + 20));
        let events = feed(&mut asm, &wire);
        assert_eq!(
            events,
            vec![RxEvent::Overflow {
                fill: SERIAL_INPUT_BUFFER_SIZE
            }]
        );

        let mut wire = vec![HDLC_FLAG];
        wire.extend(hdlc_frame(&[b'Q']));
        assert_eq!(feed(&mut asm, &wire), vec![RxEvent::FrameReady]);
        assert_eq!(asm.frame(), &[b'Q']);
    }

    #[test]
    fn test_largest_frame_fits() {
        let mut asm = InputAssembler::new();
        // Content plus two CRC bytes must leave one byte spare
        let content = vec![0x22; SERIAL_INPUT_BUFFER_SIZE - 3];
        assert_eq!(feed(&mut asm, &hdlc_frame(&content)), vec![RxEvent::FrameReady]);
        assert_eq!(asm.frame(), &content[..]);
    }
}
