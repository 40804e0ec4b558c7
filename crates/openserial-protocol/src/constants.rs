//! Protocol constants
//!
//! These constants define the framing bytes, frame tags, command identifiers
//! and status elements used on the mote serial link.

// ============================================================================
// HDLC Framing
// ============================================================================

/// Frame delimiter, sent unescaped at both ends of every frame.
pub const HDLC_FLAG: u8 = 0x7E;
/// Escape byte preceding a stuffed flag or escape byte.
pub const HDLC_ESCAPE: u8 = 0x7D;
/// Mask XORed into a byte that follows an escape byte.
pub const HDLC_ESCAPE_MASK: u8 = 0x20;
/// Initial value of the running CRC.
pub const HDLC_CRCINIT: u16 = 0xFFFF;
/// Residue left in the running CRC after a valid frame including its CRC bytes.
pub const HDLC_CRCGOOD: u16 = 0xF0B8;
/// Number of CRC bytes trailing the content of a frame.
pub const HDLC_CRC_LEN: usize = 2;

// ============================================================================
// Frame Tags (mote → host)
// ============================================================================

/// Status report produced by a debug reporter.
pub const SERFRAME_MOTE2PC_STATUS: u8 = b'S';
/// Informational report.
pub const SERFRAME_MOTE2PC_INFO: u8 = b'I';
/// Error report.
pub const SERFRAME_MOTE2PC_ERROR: u8 = b'E';
/// Critical report; the mote resets shortly after sending it.
pub const SERFRAME_MOTE2PC_CRITICAL: u8 = b'C';
/// Data exfiltrated to the host, stamped with the ASN.
pub const SERFRAME_MOTE2PC_DATA: u8 = b'D';
/// Packet overheard by the radio in sniffer mode.
pub const SERFRAME_MOTE2PC_SNIFFED_PACKET: u8 = b'P';
/// Free-form text.
pub const SERFRAME_MOTE2PC_PRINTF: u8 = b'F';

// ============================================================================
// Command Identifiers (host → mote)
// ============================================================================

/// Toggle the DAG-root role of the mote.
pub const SERFRAME_PC2MOTE_SETROOT: u8 = b'R';
/// Reset the board.
pub const SERFRAME_PC2MOTE_RESET: u8 = b'Q';
/// Inject a packet into the mesh through the bridge.
pub const SERFRAME_PC2MOTE_DATA: u8 = b'D';
/// Echo the payload back as a data frame.
pub const SERFRAME_PC2MOTE_TRIGGERSERIALECHO: u8 = b'S';
/// Generic stack command, see [`StackCommand`](crate::StackCommand).
pub const SERFRAME_PC2MOTE_COMMAND: u8 = b'C';

// ============================================================================
// Status Elements
// ============================================================================

/// Synchronization state.
pub const STATUS_ISSYNC: u8 = 0;
/// Mote identifiers.
pub const STATUS_ID: u8 = 1;
/// Routing rank.
pub const STATUS_DAGRANK: u8 = 2;
/// Output buffer write and read indexes.
pub const STATUS_OUTBUFFERINDEXES: u8 = 3;
/// Absolute slot number.
pub const STATUS_ASN: u8 = 4;
/// MAC statistics.
pub const STATUS_MACSTATS: u8 = 5;
/// One schedule entry.
pub const STATUS_SCHEDULE: u8 = 6;
/// Backoff state.
pub const STATUS_BACKOFF: u8 = 7;
/// Packet queue occupancy.
pub const STATUS_QUEUE: u8 = 8;
/// One neighbor table entry.
pub const STATUS_NEIGHBORS: u8 = 9;
/// Keep-alive period.
pub const STATUS_KAPERIOD: u8 = 10;
/// Number of status elements.
pub const STATUS_MAX: u8 = 11;

// ============================================================================
// Stack Commands (payload of SERFRAME_PC2MOTE_COMMAND)
// ============================================================================

/// Set the enhanced beacon period (1 byte, seconds).
pub const COMMAND_SET_EBPERIOD: u8 = 0;
/// Set the single communication channel (1 byte).
pub const COMMAND_SET_CHANNEL: u8 = 1;
/// Set the keep-alive period (2 bytes, slots).
pub const COMMAND_SET_KAPERIOD: u8 = 2;
/// Set the DIO period (2 bytes, ms).
pub const COMMAND_SET_DIOPERIOD: u8 = 3;
/// Set the DAO period (2 bytes, ms).
pub const COMMAND_SET_DAOPERIOD: u8 = 4;
/// Set the DAG rank (2 bytes).
pub const COMMAND_SET_DAGRANK: u8 = 5;
/// Enable or disable link-layer security (1 byte, 0 or 1).
pub const COMMAND_SET_SECURITY_STATUS: u8 = 6;
/// Set the slotframe length (2 bytes).
pub const COMMAND_SET_SLOTFRAMELENGTH: u8 = 7;
/// Enable or disable link-layer ACKs (1 byte, 0 or 1).
pub const COMMAND_SET_ACK_STATUS: u8 = 8;
/// Ask the preferred parent for cells.
pub const COMMAND_SET_6P_ADD: u8 = 9;
/// Ask the preferred parent to delete cells.
pub const COMMAND_SET_6P_DELETE: u8 = 10;
/// Ask the preferred parent for its cell count.
pub const COMMAND_SET_6P_COUNT: u8 = 11;
/// Ask the preferred parent for its cell list.
pub const COMMAND_SET_6P_LIST: u8 = 12;
/// Ask the preferred parent to clear all cells.
pub const COMMAND_SET_6P_CLEAR: u8 = 13;
/// Set the slot duration (2 bytes).
pub const COMMAND_SET_SLOTDURATION: u8 = 14;
/// Enable or disable 6P responses (1 byte, 0 or 1).
pub const COMMAND_SET_6PRESPONSE: u8 = 15;
/// Set the uinject application period (1 byte).
pub const COMMAND_SET_UINJECTPERIOD: u8 = 16;

/// Largest parameter length accepted for non-cell-list commands.
pub const COMMAND_MAX_PARAM_LEN: u8 = 3;

// ============================================================================
// Components and Error Codes
// ============================================================================

/// Component identifier of the serial transport in info/error reports.
pub const COMPONENT_OPENSERIAL: u8 = 0x04;

/// A reader asked for the input buffer with a too small destination.
pub const ERR_GETDATA_ASKS_TOO_FEW_BYTES: u8 = 0x03;
/// An inbound frame did not fit in the input buffer.
pub const ERR_INPUT_BUFFER_OVERFLOW: u8 = 0x04;
/// An inbound frame failed its CRC check.
pub const ERR_WRONG_CRC_INPUT: u8 = 0x06;
/// Outbound frames were dropped because the output buffer was full.
pub const ERR_OUTPUT_BUFFER_OVERFLOW: u8 = 0x07;

// ============================================================================
// Sizes
// ============================================================================

/// Capacity of the mote input buffer, in bytes.
pub const SERIAL_INPUT_BUFFER_SIZE: usize = 200;
/// Capacity of the mote output ring, in bytes.
pub const SERIAL_OUTPUT_BUFFER_SIZE: usize = 256;
/// Size of a 16-bit short address.
pub const ADDR_16B_LEN: usize = 2;
/// Size of an absolute slot number.
pub const ASN_LEN: usize = 5;
