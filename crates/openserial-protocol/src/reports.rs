//! Frames the mote sends to the host.

use crate::constants::*;
use crate::error::ProtocolError;

/// Payload shared by info, error and critical reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// Short address of the reporting mote.
    pub device_id: [u8; ADDR_16B_LEN],
    /// Component that raised the report.
    pub component: u8,
    /// Component-specific code.
    pub code: u8,
    /// First argument.
    pub arg1: u16,
    /// Second argument.
    pub arg2: u16,
}

/// Severity of an info/error/critical report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational.
    Info,
    /// Recoverable error.
    Error,
    /// Fatal; the mote resets after a delay.
    Critical,
}

impl Severity {
    /// Frame tag carrying this severity.
    pub fn tag(self) -> u8 {
        match self {
            Severity::Info => SERFRAME_MOTE2PC_INFO,
            Severity::Error => SERFRAME_MOTE2PC_ERROR,
            Severity::Critical => SERFRAME_MOTE2PC_CRITICAL,
        }
    }
}

/// Decoded mote → host frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoteFrame {
    /// Status element produced by a debug reporter.
    Status {
        /// Short address of the mote.
        device_id: [u8; ADDR_16B_LEN],
        /// Status element identifier (`STATUS_*`).
        element: u8,
        /// Opaque status payload.
        payload: Vec<u8>,
    },
    /// Info/error/critical report.
    Report(Severity, Report),
    /// Data exfiltrated to the host.
    Data {
        /// Short address of the mote (natural order).
        device_id: [u8; ADDR_16B_LEN],
        /// ASN when the frame was produced.
        asn: [u8; ASN_LEN],
        /// Data payload.
        payload: Vec<u8>,
    },
    /// Packet overheard in sniffer mode.
    SniffedPacket {
        /// Short address of the mote (natural order).
        device_id: [u8; ADDR_16B_LEN],
        /// Raw packet.
        payload: Vec<u8>,
        /// Channel the packet was heard on.
        channel: u8,
    },
    /// Free-form text.
    Printf {
        /// Short address of the mote.
        device_id: [u8; ADDR_16B_LEN],
        /// ASN when the text was produced.
        asn: [u8; ASN_LEN],
        /// Text, lossily decoded as UTF-8.
        text: String,
    },
}

fn require(frame: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if frame.len() < expected {
        return Err(ProtocolError::FrameTooShort {
            expected,
            actual: frame.len(),
        });
    }
    Ok(())
}

fn asn_at(frame: &[u8], offset: usize) -> [u8; ASN_LEN] {
    let mut asn = [0u8; ASN_LEN];
    asn.copy_from_slice(&frame[offset..offset + ASN_LEN]);
    asn
}

impl MoteFrame {
    /// Decode frame content (CRC already removed).
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        require(frame, 1)?;
        let tag = frame[0];

        match tag {
            SERFRAME_MOTE2PC_STATUS => {
                require(frame, 4)?;
                Ok(MoteFrame::Status {
                    device_id: [frame[1], frame[2]],
                    element: frame[3],
                    payload: frame[4..].to_vec(),
                })
            }

            SERFRAME_MOTE2PC_INFO | SERFRAME_MOTE2PC_ERROR | SERFRAME_MOTE2PC_CRITICAL => {
                require(frame, 9)?;
                let severity = match tag {
                    SERFRAME_MOTE2PC_INFO => Severity::Info,
                    SERFRAME_MOTE2PC_ERROR => Severity::Error,
                    _ => Severity::Critical,
                };
                Ok(MoteFrame::Report(
                    severity,
                    Report {
                        device_id: [frame[1], frame[2]],
                        component: frame[3],
                        code: frame[4],
                        arg1: u16::from_be_bytes([frame[5], frame[6]]),
                        arg2: u16::from_be_bytes([frame[7], frame[8]]),
                    },
                ))
            }

            SERFRAME_MOTE2PC_DATA => {
                require(frame, 3 + ASN_LEN)?;
                Ok(MoteFrame::Data {
                    // Sent reversed on the wire
                    device_id: [frame[2], frame[1]],
                    asn: asn_at(frame, 3),
                    payload: frame[3 + ASN_LEN..].to_vec(),
                })
            }

            SERFRAME_MOTE2PC_SNIFFED_PACKET => {
                require(frame, 4)?;
                let last = frame.len() - 1;
                Ok(MoteFrame::SniffedPacket {
                    device_id: [frame[2], frame[1]],
                    payload: frame[3..last].to_vec(),
                    channel: frame[last],
                })
            }

            SERFRAME_MOTE2PC_PRINTF => {
                require(frame, 3 + ASN_LEN)?;
                Ok(MoteFrame::Printf {
                    device_id: [frame[1], frame[2]],
                    asn: asn_at(frame, 3),
                    text: String::from_utf8_lossy(&frame[3 + ASN_LEN..]).into_owned(),
                })
            }

            other => Err(ProtocolError::UnknownTag(other)),
        }
    }

    /// Frame tag.
    pub fn tag(&self) -> u8 {
        match self {
            MoteFrame::Status { .. } => SERFRAME_MOTE2PC_STATUS,
            MoteFrame::Report(severity, _) => severity.tag(),
            MoteFrame::Data { .. } => SERFRAME_MOTE2PC_DATA,
            MoteFrame::SniffedPacket { .. } => SERFRAME_MOTE2PC_SNIFFED_PACKET,
            MoteFrame::Printf { .. } => SERFRAME_MOTE2PC_PRINTF,
        }
    }
}
