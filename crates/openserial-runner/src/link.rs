//! Channel pair between the simulated UART and the TCP bridge.
//!
//! The mote side ([`HostLink`]) is used from the actor thread and never
//! blocks; the host side ([`HostPort`]) is driven by the async bridge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

/// Mote side of the link.
#[derive(Debug, Clone)]
pub struct HostLink {
    to_host: mpsc::UnboundedSender<Vec<u8>>,
    connected: Arc<AtomicBool>,
    cts: Arc<watch::Sender<bool>>,
}

/// Host side of the link.
#[derive(Debug)]
pub struct HostPort {
    pub(crate) from_mote: mpsc::UnboundedReceiver<Vec<u8>>,
    pub(crate) connected: Arc<AtomicBool>,
    pub(crate) cts: watch::Receiver<bool>,
}

impl HostLink {
    /// Create a connected pair. The CTS line starts high and no peer is
    /// attached.
    pub fn new_pair() -> (HostLink, HostPort) {
        let (to_host, from_mote) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let (cts_tx, cts_rx) = watch::channel(true);
        let link = HostLink {
            to_host,
            connected: connected.clone(),
            cts: Arc::new(cts_tx),
        };
        let port = HostPort {
            from_mote,
            connected,
            cts: cts_rx,
        };
        (link, port)
    }

    /// Whether a host is attached.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Forward bytes to the host. Returns `false` when they were discarded
    /// because nobody is attached.
    pub fn send(&self, bytes: Vec<u8>) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.to_host.send(bytes).is_ok()
    }

    /// Drive the flow-control line seen by the host.
    pub fn set_cts(&self, clear_to_send: bool) {
        self.cts.send_replace(clear_to_send);
    }

    /// Current flow-control level.
    pub fn cts(&self) -> bool {
        *self.cts.borrow()
    }
}

impl HostPort {
    /// Mark a host as attached or detached.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Whether a host is attached.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Take the next chunk the mote wrote, if any.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.from_mote.try_recv().ok()
    }

    /// Wait for the next chunk the mote wrote. `None` once the mote is gone.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.from_mote.recv().await
    }

    /// Flow-control level the mote is driving.
    pub fn cts(&self) -> bool {
        *self.cts.borrow()
    }

    /// Drop anything the mote wrote while no host was attached.
    pub fn discard_pending(&mut self) {
        while self.from_mote.try_recv().is_ok() {}
    }
}
