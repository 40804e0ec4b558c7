//! Inbound command dispatch.
//!
//! The first content byte of a completed frame selects the command. The
//! built-in commands go straight to the mote collaborators; an externally
//! registered handler for the same identifier runs afterwards.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use openserial_protocol::{
    StackCommand, SERFRAME_PC2MOTE_COMMAND, SERFRAME_PC2MOTE_DATA, SERFRAME_PC2MOTE_RESET,
    SERFRAME_PC2MOTE_SETROOT, SERFRAME_PC2MOTE_TRIGGERSERIALECHO,
};

use crate::OpenSerial;

/// Callback for an externally registered command.
///
/// Receives the whole frame content, command byte included. Runs in the
/// receive path, so it must be short and must not block.
pub type CommandHandler = Arc<dyn Fn(&OpenSerial, &[u8]) + Send + Sync>;

/// Fixed-capacity table of registered commands.
pub struct CommandTable {
    entries: VecDeque<(u8, CommandHandler)>,
    capacity: usize,
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTable")
            .field("ids", &self.ids())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl CommandTable {
    /// Create a table holding at most `capacity` registrations.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        CommandTable {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Register `handler` for `id`.
    ///
    /// An existing registration for `id` is replaced. When the table is full
    /// the oldest registration is evicted and returned.
    pub fn register(&mut self, id: u8, handler: CommandHandler) -> Option<u8> {
        if let Some(entry) = self.entries.iter_mut().find(|(known, _)| *known == id) {
            entry.1 = handler;
            return None;
        }
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front().map(|(old, _)| old)
        } else {
            None
        };
        self.entries.push_back((id, handler));
        evicted
    }

    /// Handler registered for `id`.
    pub fn lookup(&self, id: u8) -> Option<CommandHandler> {
        self.entries
            .iter()
            .find(|(known, _)| *known == id)
            .map(|(_, handler)| Arc::clone(handler))
    }

    /// Registered identifiers, oldest first.
    pub fn ids(&self) -> Vec<u8> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Label used for a command identifier in logs and metrics.
pub(crate) fn command_label(id: u8) -> String {
    if id.is_ascii_graphic() {
        (id as char).to_string()
    } else {
        format!("0x{:02x}", id)
    }
}

/// Run the built-in action for `frame`, then any registered handler.
pub(crate) fn dispatch(serial: &OpenSerial, frame: &[u8]) {
    let Some(&id) = frame.first() else {
        return;
    };
    let payload = &frame[1..];
    let services = serial.services();

    match id {
        SERFRAME_PC2MOTE_SETROOT => services.trigger_about_root(),
        SERFRAME_PC2MOTE_RESET => services.board_reset(),
        SERFRAME_PC2MOTE_DATA => services.bridge_data(payload),
        SERFRAME_PC2MOTE_TRIGGERSERIALECHO => serial.print_data(payload),
        SERFRAME_PC2MOTE_COMMAND => match StackCommand::decode(payload) {
            Ok(command) => services.apply_command(command),
            Err(e) => log::debug!("ignoring malformed stack command: {}", e),
        },
        _ => {}
    }

    // Cloned out so the handler may register commands itself
    let handler = serial.commands().lock().lookup(id);
    if let Some(handler) = handler {
        handler(serial, frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> CommandHandler {
        let log = Arc::clone(log);
        Arc::new(move |_: &OpenSerial, _: &[u8]| log.lock().push(name))
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut table = CommandTable::new(2);
        let log = Arc::new(Mutex::new(Vec::new()));
        assert_eq!(table.register(b'X', recorder(&log, "first")), None);
        assert_eq!(table.register(b'X', recorder(&log, "second")), None);
        assert_eq!(table.len(), 1);
        assert_eq!(table.ids(), vec![b'X']);
    }

    #[test]
    fn test_full_table_evicts_oldest() {
        let mut table = CommandTable::new(2);
        let log = Arc::new(Mutex::new(Vec::new()));
        table.register(b'A', recorder(&log, "a"));
        table.register(b'B', recorder(&log, "b"));
        assert_eq!(table.register(b'C', recorder(&log, "c")), Some(b'A'));
        assert_eq!(table.ids(), vec![b'B', b'C']);
        assert!(table.lookup(b'A').is_none());
    }

    #[test]
    fn test_single_slot_table() {
        let mut table = CommandTable::new(0);
        let log = Arc::new(Mutex::new(Vec::new()));
        table.register(b'A', recorder(&log, "a"));
        assert_eq!(table.register(b'B', recorder(&log, "b")), Some(b'A'));
        assert_eq!(table.ids(), vec![b'B']);
    }

    #[test]
    fn test_command_label() {
        assert_eq!(command_label(b'S'), "S");
        assert_eq!(command_label(0x01), "0x01");
    }
}
