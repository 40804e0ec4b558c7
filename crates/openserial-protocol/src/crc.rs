//! Running 16-bit frame check sequence.
//!
//! Reflected CCITT polynomial (0x8408), as used by HDLC/PPP. The accumulator
//! starts at [`HDLC_CRCINIT`](crate::HDLC_CRCINIT); the sender appends the
//! one's complement low byte first, and the receiver's accumulator over content
//! plus CRC then equals [`HDLC_CRCGOOD`](crate::HDLC_CRCGOOD).

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0x8408 } else { crc >> 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static FCS_TABLE: [u16; 256] = build_table();

/// Fold one byte into the running CRC.
#[inline]
pub fn crc_iteration(crc: u16, byte: u8) -> u16 {
    (crc >> 8) ^ FCS_TABLE[((crc ^ byte as u16) & 0xFF) as usize]
}
