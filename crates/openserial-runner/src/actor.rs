//! Single-threaded mote actor.
//!
//! Everything that would be an interrupt on real hardware (a byte arriving,
//! the UART finishing a byte, a timer expiring) is an event on one channel.
//! The actor thread is the only caller of the transport's interrupt entry
//! points, so they never run concurrently with each other.
//!
//! ## Key Types
//!
//! - [`MoteEvent`]: what can happen to the mote
//! - [`MoteHandle`]: cloneable sender used by the UART, the mote and the bridge
//! - [`MoteThread`]: the running actor; join it with [`MoteThread::shutdown`]

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use openserial::{OpenSerial, TimerCallback};
use tracing::{debug, info, trace};

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::link::HostLink;
use crate::reporters::status_reporters;
use crate::sim_mote::SimMote;
use crate::sim_uart::SimUart;

// ============================================================================
// Events
// ============================================================================

/// Something that happens to the mote.
pub enum MoteEvent {
    /// Bytes from the host, delivered one receive interrupt each.
    RxBytes(Vec<u8>),
    /// The UART finished the byte in flight.
    TxReady,
    /// One-shot timer expired.
    Timer(TimerCallback),
    /// Periodic status print.
    DebugTick,
    /// Board reset requested.
    BoardReset,
    /// Stop the actor.
    Shutdown,
}

impl fmt::Debug for MoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoteEvent::RxBytes(bytes) => f.debug_tuple("RxBytes").field(&bytes.len()).finish(),
            MoteEvent::TxReady => f.write_str("TxReady"),
            MoteEvent::Timer(_) => f.write_str("Timer"),
            MoteEvent::DebugTick => f.write_str("DebugTick"),
            MoteEvent::BoardReset => f.write_str("BoardReset"),
            MoteEvent::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Event with the instant it becomes due.
#[derive(Debug)]
pub(crate) struct Envelope {
    due: Instant,
    event: MoteEvent,
}

/// Queued event. Ties on `due` keep arrival order.
struct Scheduled {
    due: Instant,
    seq: u64,
    event: MoteEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (earliest first)
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Sends events to a mote actor.
#[derive(Debug, Clone)]
pub struct MoteHandle {
    tx: Sender<Envelope>,
}

impl MoteHandle {
    pub(crate) fn channel() -> (MoteHandle, Receiver<Envelope>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (MoteHandle { tx }, rx)
    }

    /// Deliver an event now.
    pub fn send(&self, event: MoteEvent) -> Result<(), RunnerError> {
        self.schedule(Duration::ZERO, event)
    }

    /// Deliver an event after `delay`.
    pub fn schedule(&self, delay: Duration, event: MoteEvent) -> Result<(), RunnerError> {
        let envelope = Envelope {
            due: Instant::now() + delay,
            event,
        };
        self.tx.send(envelope).map_err(|_| RunnerError::ActorStopped)
    }
}

// ============================================================================
// Actor
// ============================================================================

struct MoteActor {
    name: String,
    serial: Arc<OpenSerial>,
    uart: Arc<SimUart>,
    mote: Arc<SimMote>,
    inbox: Receiver<Envelope>,
    queue: BinaryHeap<Scheduled>,
    next_seq: u64,
    debug_period: Option<Duration>,
}

impl MoteActor {
    fn push(&mut self, due: Instant, event: MoteEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled { due, seq, event });
    }

    fn run(mut self) {
        if let Some(period) = self.debug_period {
            self.push(Instant::now() + period, MoteEvent::DebugTick);
        }

        loop {
            let received = match self.queue.peek() {
                Some(next) => self
                    .inbox
                    .recv_timeout(next.due.saturating_duration_since(Instant::now())),
                None => self.inbox.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(envelope) => self.push(envelope.due, envelope.event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            while let Ok(envelope) = self.inbox.try_recv() {
                self.push(envelope.due, envelope.event);
            }

            let now = Instant::now();
            while self.queue.peek().is_some_and(|next| next.due <= now) {
                let Some(next) = self.queue.pop() else { break };
                if !self.process(next.event) {
                    debug!("{}: Shutting down", self.name);
                    return;
                }
            }
        }
    }

    /// Handle one event. Returns `false` to stop.
    fn process(&mut self, event: MoteEvent) -> bool {
        trace!("{}: {:?}", self.name, event);
        match event {
            MoteEvent::RxBytes(bytes) => {
                for byte in bytes {
                    self.uart.latch_rx(byte);
                    self.serial.isr_rx();
                }
            }
            MoteEvent::TxReady => self.serial.isr_tx(),
            MoteEvent::Timer(callback) => callback(),
            MoteEvent::DebugTick => {
                self.serial.trigger_debug_print();
                if let Some(period) = self.debug_period {
                    self.push(Instant::now() + period, MoteEvent::DebugTick);
                }
            }
            MoteEvent::BoardReset => {
                info!("{}: Board reset", self.name);
                // Pending timers and the byte in flight belong to the old boot
                self.queue
                    .retain(|s| !matches!(s.event, MoteEvent::Timer(_) | MoteEvent::TxReady));
                self.serial.reinit();
                self.mote.on_reset();
            }
            MoteEvent::Shutdown => return false,
        }
        true
    }
}

// ============================================================================
// Thread
// ============================================================================

/// A mote running on its own thread.
pub struct MoteThread {
    events: MoteHandle,
    serial: Arc<OpenSerial>,
    mote: Arc<SimMote>,
    thread: JoinHandle<()>,
}

impl MoteThread {
    /// Sender for events to this mote.
    pub fn events(&self) -> &MoteHandle {
        &self.events
    }

    /// The mote's transport.
    pub fn serial(&self) -> &Arc<OpenSerial> {
        &self.serial
    }

    /// The simulated stack behind the transport.
    pub fn mote(&self) -> &Arc<SimMote> {
        &self.mote
    }

    /// Check if the actor has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Stop the actor and wait for it.
    pub fn shutdown(self) -> Result<(), RunnerError> {
        // Already stopped is fine, the join below reports a panic
        let _ = self.events.send(MoteEvent::Shutdown);
        self.thread.join().map_err(|_| RunnerError::ThreadPanicked)
    }
}

/// Build a simulated mote wired to `link` and start its actor thread.
pub fn spawn_mote(config: &RunnerConfig, link: HostLink) -> Result<MoteThread, RunnerError> {
    let (events, inbox) = MoteHandle::channel();
    let uart = Arc::new(SimUart::new(link, events.clone(), config.byte_time()));
    let mote = Arc::new(SimMote::new(config, events.clone()));
    let serial = Arc::new(OpenSerial::new(
        config.serial.clone(),
        uart.clone(),
        mote.clone(),
        status_reporters(&mote),
    )?);

    let name = format!("Mote[{:04x}]", config.device_id);
    let actor = MoteActor {
        name: name.clone(),
        serial: serial.clone(),
        uart,
        mote: mote.clone(),
        inbox,
        queue: BinaryHeap::new(),
        next_seq: 0,
        debug_period: config.debug_period(),
    };

    let thread = thread::Builder::new()
        .name(format!("mote-{:04x}", config.device_id))
        .spawn(move || actor.run())?;
    debug!("{}: Actor started", name);

    Ok(MoteThread {
        events,
        serial,
        mote,
        thread,
    })
}
