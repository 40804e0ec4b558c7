//! Commands the host sends to the mote.

use crate::constants::*;
use crate::error::ProtocolError;

/// 6P operation requested from the preferred parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SixtopOperation {
    /// Add cells.
    Add,
    /// Delete cells.
    Delete,
    /// Count cells.
    Count,
    /// List cells.
    List,
    /// Clear all cells.
    Clear,
}

impl SixtopOperation {
    fn command_id(self) -> u8 {
        match self {
            SixtopOperation::Add => COMMAND_SET_6P_ADD,
            SixtopOperation::Delete => COMMAND_SET_6P_DELETE,
            SixtopOperation::Count => COMMAND_SET_6P_COUNT,
            SixtopOperation::List => COMMAND_SET_6P_LIST,
            SixtopOperation::Clear => COMMAND_SET_6P_CLEAR,
        }
    }
}

/// Stack configuration command carried by a `SERFRAME_PC2MOTE_COMMAND` frame.
///
/// Layout after the frame tag: `[command_id, len, params...]`, 16-bit
/// parameters little-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackCommand {
    /// Enhanced beacon period, in seconds.
    SetEbPeriod(u8),
    /// Single channel used by the stack and the sniffer.
    SetChannel(u8),
    /// Keep-alive period, in slots.
    SetKaPeriod(u16),
    /// DIO period, in milliseconds.
    SetDioPeriod(u16),
    /// DAO period, in milliseconds.
    SetDaoPeriod(u16),
    /// Routing rank.
    SetDagRank(u16),
    /// Link-layer security on or off.
    SetSecurity(bool),
    /// Slotframe length, in slots.
    SetSlotframeLength(u16),
    /// Link-layer ACKs on or off.
    SetAck(bool),
    /// 6P request to the preferred parent.
    Sixtop {
        /// Requested operation.
        operation: SixtopOperation,
        /// Slot offsets for add/delete; empty selects a random cell.
        slot_offsets: Vec<u8>,
    },
    /// Slot duration.
    SetSlotDuration(u16),
    /// 6P responses on or off.
    SetSixtopResponse(bool),
    /// uinject application period.
    SetUinjectPeriod(u8),
}

impl StackCommand {
    /// Encode as `[command_id, len, params...]`.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + COMMAND_MAX_PARAM_LEN as usize);
        let u8_param = |buf: &mut Vec<u8>, id: u8, v: u8| buf.extend_from_slice(&[id, 1, v]);
        match self {
            StackCommand::SetEbPeriod(v) => u8_param(&mut buf, COMMAND_SET_EBPERIOD, *v),
            StackCommand::SetChannel(v) => u8_param(&mut buf, COMMAND_SET_CHANNEL, *v),
            StackCommand::SetSecurity(v) => {
                u8_param(&mut buf, COMMAND_SET_SECURITY_STATUS, *v as u8)
            }
            StackCommand::SetAck(v) => u8_param(&mut buf, COMMAND_SET_ACK_STATUS, *v as u8),
            StackCommand::SetSixtopResponse(v) => {
                u8_param(&mut buf, COMMAND_SET_6PRESPONSE, *v as u8)
            }
            StackCommand::SetUinjectPeriod(v) => u8_param(&mut buf, COMMAND_SET_UINJECTPERIOD, *v),
            StackCommand::SetKaPeriod(v)
            | StackCommand::SetDioPeriod(v)
            | StackCommand::SetDaoPeriod(v)
            | StackCommand::SetDagRank(v)
            | StackCommand::SetSlotframeLength(v)
            | StackCommand::SetSlotDuration(v) => {
                buf.push(self.command_id());
                buf.push(2);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            StackCommand::Sixtop { operation, slot_offsets } => {
                buf.push(operation.command_id());
                buf.push(slot_offsets.len() as u8);
                buf.extend_from_slice(slot_offsets);
            }
        }
        buf
    }

    /// Command identifier.
    pub fn command_id(&self) -> u8 {
        match self {
            StackCommand::SetEbPeriod(_) => COMMAND_SET_EBPERIOD,
            StackCommand::SetChannel(_) => COMMAND_SET_CHANNEL,
            StackCommand::SetKaPeriod(_) => COMMAND_SET_KAPERIOD,
            StackCommand::SetDioPeriod(_) => COMMAND_SET_DIOPERIOD,
            StackCommand::SetDaoPeriod(_) => COMMAND_SET_DAOPERIOD,
            StackCommand::SetDagRank(_) => COMMAND_SET_DAGRANK,
            StackCommand::SetSecurity(_) => COMMAND_SET_SECURITY_STATUS,
            StackCommand::SetSlotframeLength(_) => COMMAND_SET_SLOTFRAMELENGTH,
            StackCommand::SetAck(_) => COMMAND_SET_ACK_STATUS,
            StackCommand::Sixtop { operation, .. } => operation.command_id(),
            StackCommand::SetSlotDuration(_) => COMMAND_SET_SLOTDURATION,
            StackCommand::SetSixtopResponse(_) => COMMAND_SET_6PRESPONSE,
            StackCommand::SetUinjectPeriod(_) => COMMAND_SET_UINJECTPERIOD,
        }
    }

    /// Decode from `[command_id, len, params...]`.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < 2 {
            return Err(ProtocolError::FrameTooShort {
                expected: 2,
                actual: data.len(),
            });
        }
        let command = data[0];
        let len = data[1];
        if len > COMMAND_MAX_PARAM_LEN {
            return Err(ProtocolError::InvalidParamLength { command, len });
        }
        let params = &data[2..];
        if params.len() < len as usize {
            return Err(ProtocolError::FrameTooShort {
                expected: 2 + len as usize,
                actual: data.len(),
            });
        }
        let params = &params[..len as usize];

        let byte = || -> Result<u8, ProtocolError> {
            match params {
                [v] => Ok(*v),
                _ => Err(ProtocolError::InvalidParamLength { command, len }),
            }
        };
        let word = || -> Result<u16, ProtocolError> {
            match params {
                [lo, hi] => Ok(u16::from_le_bytes([*lo, *hi])),
                _ => Err(ProtocolError::InvalidParamLength { command, len }),
            }
        };
        let flag = || -> Result<bool, ProtocolError> {
            match byte()? {
                0 => Ok(false),
                1 => Ok(true),
                value => Err(ProtocolError::InvalidParamValue { command, value }),
            }
        };
        let sixtop = |operation: SixtopOperation, with_cells: bool| StackCommand::Sixtop {
            operation,
            slot_offsets: if with_cells { params.to_vec() } else { Vec::new() },
        };

        let cmd = match command {
            COMMAND_SET_EBPERIOD => StackCommand::SetEbPeriod(byte()?),
            COMMAND_SET_CHANNEL => StackCommand::SetChannel(byte()?),
            COMMAND_SET_KAPERIOD => StackCommand::SetKaPeriod(word()?),
            COMMAND_SET_DIOPERIOD => StackCommand::SetDioPeriod(word()?),
            COMMAND_SET_DAOPERIOD => StackCommand::SetDaoPeriod(word()?),
            COMMAND_SET_DAGRANK => StackCommand::SetDagRank(word()?),
            COMMAND_SET_SECURITY_STATUS => StackCommand::SetSecurity(flag()?),
            COMMAND_SET_SLOTFRAMELENGTH => StackCommand::SetSlotframeLength(word()?),
            COMMAND_SET_ACK_STATUS => StackCommand::SetAck(flag()?),
            COMMAND_SET_6P_ADD => sixtop(SixtopOperation::Add, true),
            COMMAND_SET_6P_DELETE => sixtop(SixtopOperation::Delete, true),
            COMMAND_SET_6P_COUNT => sixtop(SixtopOperation::Count, false),
            COMMAND_SET_6P_LIST => sixtop(SixtopOperation::List, false),
            COMMAND_SET_6P_CLEAR => sixtop(SixtopOperation::Clear, false),
            COMMAND_SET_SLOTDURATION => StackCommand::SetSlotDuration(word()?),
            COMMAND_SET_6PRESPONSE => StackCommand::SetSixtopResponse(flag()?),
            COMMAND_SET_UINJECTPERIOD => StackCommand::SetUinjectPeriod(byte()?),
            other => return Err(ProtocolError::UnknownCommand(other)),
        };
        Ok(cmd)
    }
}

/// Frames the host sends to the mote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Toggle the DAG-root role.
    SetRoot,
    /// Reset the board.
    Reset,
    /// Inject a packet into the mesh through the bridge.
    InjectData(Vec<u8>),
    /// Ask the mote to echo the payload back as a data frame.
    TriggerEcho(Vec<u8>),
    /// Stack configuration command.
    Command(StackCommand),
    /// Any other identifier, e.g. one served by a registered handler.
    Raw {
        /// Command identifier.
        id: u8,
        /// Payload after the identifier.
        payload: Vec<u8>,
    },
}

impl HostCommand {
    /// Encode the frame content (unframed).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            HostCommand::SetRoot => buf.push(SERFRAME_PC2MOTE_SETROOT),
            HostCommand::Reset => buf.push(SERFRAME_PC2MOTE_RESET),
            HostCommand::InjectData(payload) => {
                buf.push(SERFRAME_PC2MOTE_DATA);
                buf.extend_from_slice(payload);
            }
            HostCommand::TriggerEcho(payload) => {
                buf.push(SERFRAME_PC2MOTE_TRIGGERSERIALECHO);
                buf.extend_from_slice(payload);
            }
            HostCommand::Command(cmd) => {
                buf.push(SERFRAME_PC2MOTE_COMMAND);
                buf.extend_from_slice(&cmd.encode());
            }
            HostCommand::Raw { id, payload } => {
                buf.push(*id);
                buf.extend_from_slice(payload);
            }
        }
        buf
    }

    /// Decode frame content (CRC already removed).
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (&id, payload) = frame.split_first().ok_or(ProtocolError::FrameTooShort {
            expected: 1,
            actual: 0,
        })?;
        let cmd = match id {
            SERFRAME_PC2MOTE_SETROOT => HostCommand::SetRoot,
            SERFRAME_PC2MOTE_RESET => HostCommand::Reset,
            SERFRAME_PC2MOTE_DATA => HostCommand::InjectData(payload.to_vec()),
            SERFRAME_PC2MOTE_TRIGGERSERIALECHO => HostCommand::TriggerEcho(payload.to_vec()),
            SERFRAME_PC2MOTE_COMMAND => HostCommand::Command(StackCommand::decode(payload)?),
            id => HostCommand::Raw {
                id,
                payload: payload.to_vec(),
            },
        };
        Ok(cmd)
    }
}
