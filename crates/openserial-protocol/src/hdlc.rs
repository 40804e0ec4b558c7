//! HDLC framing.
//!
//! Frames are delimited by [`HDLC_FLAG`]. Inside a frame any flag or escape
//! byte is sent as [`HDLC_ESCAPE`] followed by the byte XORed with
//! [`HDLC_ESCAPE_MASK`]. The running CRC covers the logical (unescaped) bytes
//! and its one's complement is appended low byte first, escaped like content.
//!
//! ```text
//! +------+---------------------------+--------+--------+------+
//! | FLAG | content (escaped)         | crc_lo | crc_hi | FLAG |
//! +------+---------------------------+--------+--------+------+
//! ```
//!
//! [`HdlcEncoder`] and [`HdlcDecoder`] are the per-byte state machines the mote
//! runs: open, zero or more bytes, close. [`HdlcCodec`] is the host-side stream
//! decoder built for arbitrary chunked input.

use bytes::{Buf, BytesMut};

use crate::constants::*;
use crate::crc::crc_iteration;

/// Destination for encoded bytes.
pub trait ByteSink {
    /// Append one byte.
    fn put_byte(&mut self, byte: u8);
}

impl ByteSink for Vec<u8> {
    fn put_byte(&mut self, byte: u8) {
        self.push(byte);
    }
}

impl ByteSink for BytesMut {
    fn put_byte(&mut self, byte: u8) {
        self.extend_from_slice(&[byte]);
    }
}

// ============================================================================
// Encoder
// ============================================================================

/// Byte-stuffing encoder with a running CRC.
#[derive(Debug, Clone, Copy)]
pub struct HdlcEncoder {
    crc: u16,
}

impl Default for HdlcEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl HdlcEncoder {
    /// Create an encoder.
    pub const fn new() -> Self {
        HdlcEncoder { crc: HDLC_CRCINIT }
    }

    /// Reset the CRC and emit the opening flag.
    pub fn open<S: ByteSink + ?Sized>(&mut self, out: &mut S) {
        self.crc = HDLC_CRCINIT;
        out.put_byte(HDLC_FLAG);
    }

    /// Fold `byte` into the CRC, then emit it, escaped if needed.
    pub fn write<S: ByteSink + ?Sized>(&mut self, out: &mut S, byte: u8) {
        self.crc = crc_iteration(self.crc, byte);
        if byte == HDLC_FLAG || byte == HDLC_ESCAPE {
            out.put_byte(HDLC_ESCAPE);
            out.put_byte(byte ^ HDLC_ESCAPE_MASK);
        } else {
            out.put_byte(byte);
        }
    }

    /// Write every byte of `data`.
    pub fn write_all<S: ByteSink + ?Sized>(&mut self, out: &mut S, data: &[u8]) {
        for &b in data {
            self.write(out, b);
        }
    }

    /// Emit the CRC (low byte first) and the closing flag.
    pub fn close<S: ByteSink + ?Sized>(&mut self, out: &mut S) {
        let fcs = !self.crc;
        self.write(out, (fcs & 0xFF) as u8);
        self.write(out, (fcs >> 8) as u8);
        out.put_byte(HDLC_FLAG);
    }

    /// Current value of the running CRC.
    pub fn crc(&self) -> u16 {
        self.crc
    }
}

/// Encode `content` as one complete frame.
pub fn hdlc_frame(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() * 2 + 6);
    let mut encoder = HdlcEncoder::new();
    encoder.open(&mut out);
    encoder.write_all(&mut out, content);
    encoder.close(&mut out);
    out
}

// ============================================================================
// Decoder
// ============================================================================

/// Un-stuffing decoder writing into a fixed buffer of `N` bytes.
///
/// The buffer is reused frame after frame; nothing is allocated.
#[derive(Debug, Clone)]
pub struct HdlcDecoder<const N: usize> {
    buf: [u8; N],
    fill: usize,
    escaping: bool,
    crc: u16,
}

impl<const N: usize> Default for HdlcDecoder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> HdlcDecoder<N> {
    /// Create an empty decoder.
    pub const fn new() -> Self {
        HdlcDecoder {
            buf: [0u8; N],
            fill: 0,
            escaping: false,
            crc: HDLC_CRCINIT,
        }
    }

    /// Start a new frame.
    pub fn open(&mut self) {
        self.fill = 0;
        self.crc = HDLC_CRCINIT;
        self.escaping = false;
    }

    /// Feed one raw byte.
    ///
    /// Returns `false` if the byte carried data but the buffer was already
    /// full; the byte is then lost and the frame should be discarded.
    pub fn decode_byte(&mut self, byte: u8) -> bool {
        if byte == HDLC_ESCAPE {
            self.escaping = true;
            return true;
        }
        let byte = if self.escaping {
            self.escaping = false;
            byte ^ HDLC_ESCAPE_MASK
        } else {
            byte
        };
        if self.fill >= N {
            return false;
        }
        self.buf[self.fill] = byte;
        self.fill += 1;
        self.crc = crc_iteration(self.crc, byte);
        true
    }

    /// Finish the frame: strip the CRC bytes if it checks, else empty the
    /// buffer. Returns the resulting fill level.
    pub fn close(&mut self) -> usize {
        if self.crc == HDLC_CRCGOOD {
            self.fill = self.fill.saturating_sub(HDLC_CRC_LEN);
        } else {
            self.fill = 0;
        }
        self.fill
    }

    /// Discard whatever has been assembled.
    pub fn reset(&mut self) {
        self.fill = 0;
    }

    /// Number of bytes currently in the buffer.
    pub fn fill_level(&self) -> usize {
        self.fill
    }

    /// Buffer capacity.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Whether the previous byte was an escape.
    pub fn is_escaping(&self) -> bool {
        self.escaping
    }

    /// Running CRC over the bytes decoded so far.
    pub fn crc(&self) -> u16 {
        self.crc
    }

    /// The bytes assembled so far (after [`close`](Self::close): the content).
    pub fn content(&self) -> &[u8] {
        &self.buf[..self.fill]
    }
}

// ============================================================================
// Host-side stream codec
// ============================================================================

/// Maximum frame size the host codec buffers before giving up on a frame.
pub const MAX_HOST_FRAME_SIZE: usize = 1024;

/// A codec for reading HDLC frames out of a chunked byte stream.
///
/// Bytes before the first flag are discarded, empty frames between
/// back-to-back flags are skipped and frames failing their CRC are dropped
/// and counted.
#[derive(Debug, Default)]
pub struct HdlcCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
    /// Number of frames dropped for a bad CRC.
    crc_errors: u64,
}

impl HdlcCodec {
    /// Create a new frame codec.
    pub fn new() -> Self {
        HdlcCodec {
            buffer: BytesMut::with_capacity(MAX_HOST_FRAME_SIZE),
            crc_errors: 0,
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode a complete frame from the buffer.
    ///
    /// Returns `Some(content)` (CRC removed) if a valid frame is available,
    /// or `None` if more data is needed.
    pub fn decode(&mut self) -> Option<Vec<u8>> {
        loop {
            // Scan for the opening flag, discarding any preceding garbage
            while !self.buffer.is_empty() && self.buffer[0] != HDLC_FLAG {
                self.buffer.advance(1);
            }
            if self.buffer.is_empty() {
                return None;
            }

            let end = match self.buffer[1..].iter().position(|&b| b == HDLC_FLAG) {
                Some(pos) => pos + 1,
                None => {
                    if self.buffer.len() > MAX_HOST_FRAME_SIZE {
                        log::warn!("discarding {} bytes without closing flag", self.buffer.len());
                        self.buffer.clear();
                    }
                    return None;
                }
            };

            if end == 1 {
                // Back-to-back flags
                self.buffer.advance(1);
                continue;
            }

            // Keep the closing flag: it may also open the next frame
            let raw = self.buffer.split_to(end);
            match unstuff(&raw[1..]) {
                Ok(content) => return Some(content),
                Err(_) => {
                    self.crc_errors += 1;
                    log::debug!("dropping frame of {} raw bytes with bad CRC", raw.len());
                }
            }
        }
    }

    /// Number of frames dropped so far for a bad CRC.
    pub fn crc_errors(&self) -> u64 {
        self.crc_errors
    }
}

/// Un-stuff the bytes between two flags and check the CRC.
fn unstuff(raw: &[u8]) -> Result<Vec<u8>, crate::ProtocolError> {
    let mut decoder = HdlcDecoder::<MAX_HOST_FRAME_SIZE>::new();
    decoder.open();
    for &b in raw {
        decoder.decode_byte(b);
    }
    let crc_ok = decoder.crc() == HDLC_CRCGOOD && decoder.fill_level() > HDLC_CRC_LEN;
    if !crc_ok {
        return Err(crate::ProtocolError::BadCrc);
    }
    decoder.close();
    Ok(decoder.content().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all<const N: usize>(decoder: &mut HdlcDecoder<N>, wire: &[u8]) -> usize {
        // Strip the flags like the receive state machine does
        assert_eq!(wire[0], HDLC_FLAG);
        assert_eq!(wire[wire.len() - 1], HDLC_FLAG);
        decoder.open();
        for &b in &wire[1..wire.len() - 1] {
            assert!(decoder.decode_byte(b));
        }
        decoder.close()
    }

    #[test]
    fn test_roundtrip_with_special_bytes() {
        let payloads: [&[u8]; 4] = [
            &[],
            &[0x00, 0x01, 0x02],
            &[HDLC_FLAG, HDLC_ESCAPE, HDLC_FLAG ^ HDLC_ESCAPE_MASK, 0xFF],
            &[HDLC_ESCAPE, HDLC_ESCAPE, HDLC_ESCAPE],
        ];
        let mut decoder = HdlcDecoder::<64>::new();
        for payload in payloads {
            let wire = hdlc_frame(payload);
            // No unescaped flag inside the frame
            assert!(!wire[1..wire.len() - 1].contains(&HDLC_FLAG));
            decode_all(&mut decoder, &wire);
            assert_eq!(decoder.content(), payload);
        }
    }

    #[test]
    fn test_escaping_layout() {
        let wire = hdlc_frame(&[HDLC_FLAG]);
        assert_eq!(&wire[..3], &[HDLC_FLAG, HDLC_ESCAPE, 0x5E]);

        let wire = hdlc_frame(&[HDLC_ESCAPE]);
        assert_eq!(&wire[..3], &[HDLC_FLAG, HDLC_ESCAPE, 0x5D]);
    }

    #[test]
    fn test_every_single_bit_flip_is_rejected() {
        let content = [b'S', 0x10, 0x20, 0x07, 0x01, 0x02];
        let wire = hdlc_frame(&content);
        let mut decoder = HdlcDecoder::<64>::new();

        for idx in 1..wire.len() - 1 {
            for bit in 0..8 {
                let mut corrupted = wire.clone();
                corrupted[idx] ^= 1 << bit;
                decoder.open();
                for &b in &corrupted[1..corrupted.len() - 1] {
                    decoder.decode_byte(b);
                }
                assert_eq!(decoder.close(), 0, "flip of bit {} in byte {} accepted", bit, idx);
            }
        }
    }

    #[test]
    fn test_decoder_refuses_overflow() {
        let mut decoder = HdlcDecoder::<2>::new();
        decoder.open();
        assert!(decoder.decode_byte(1));
        assert!(decoder.decode_byte(2));
        assert!(!decoder.decode_byte(3));
        // Escape bytes carry no data and are always accepted
        assert!(decoder.decode_byte(HDLC_ESCAPE));
        assert_eq!(decoder.fill_level(), 2);
    }

    #[test]
    fn test_open_clears_pending_escape() {
        let mut decoder = HdlcDecoder::<8>::new();
        decoder.open();
        decoder.decode_byte(HDLC_ESCAPE);
        assert!(decoder.is_escaping());
        decoder.open();
        assert!(!decoder.is_escaping());
        decoder.decode_byte(0x41);
        assert_eq!(decoder.content(), &[0x41]);
    }

    #[test]
    fn test_codec_multiple_and_partial() {
        let mut codec = HdlcCodec::new();
        let first = hdlc_frame(b"First");
        let second = hdlc_frame(&[HDLC_FLAG, b'x']);

        codec.push(&[0x00, 0x13]); // garbage
        codec.push(&first);
        codec.push(&second[..3]);

        assert_eq!(codec.decode().as_deref(), Some(&b"First"[..]));
        assert!(codec.decode().is_none());

        codec.push(&second[3..]);
        assert_eq!(codec.decode().as_deref(), Some(&[HDLC_FLAG, b'x'][..]));
        assert!(codec.decode().is_none());
    }

    #[test]
    fn test_codec_drops_bad_crc() {
        let mut codec = HdlcCodec::new();
        let mut bad = hdlc_frame(b"abc");
        bad[2] ^= 0x01;
        codec.push(&bad);
        codec.push(&hdlc_frame(b"ok"));

        assert_eq!(codec.decode().as_deref(), Some(&b"ok"[..]));
        assert_eq!(codec.crc_errors(), 1);
    }
}
