//! Simulated stack behind the transport.
//!
//! Only fakes the values the status reporters and the host commands touch:
//! identity, slot clock, routing rank, a handful of periods, a cell list and
//! a bridge queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use openserial::{MoteServices, TimerCallback};
use openserial_protocol::{SixtopOperation, StackCommand, ADDR_16B_LEN, ASN_LEN};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::actor::{MoteEvent, MoteHandle};
use crate::config::{MoteConfig, RunnerConfig};

/// Length of one slot of the simulated clock.
pub const SLOT_DURATION: Duration = Duration::from_millis(10);

/// Packets kept in the bridge queue before the oldest is dropped.
pub const BRIDGE_QUEUE_LEN: usize = 10;

const DEFAULT_EB_PERIOD_S: u8 = 10;
const DEFAULT_DIO_PERIOD_MS: u16 = 1700;
const DEFAULT_DAO_PERIOD_MS: u16 = 5000;
const DEFAULT_SLOTFRAME_LENGTH: u16 = 101;
const DEFAULT_UINJECT_PERIOD_S: u8 = 60;

/// Mutable state of the simulated stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoteState {
    pub is_sync: bool,
    pub is_root: bool,
    pub pan_id: u16,
    pub dag_rank: u16,
    pub channel: u8,
    pub ka_period: u16,
    pub eb_period: u8,
    pub dio_period: u16,
    pub dao_period: u16,
    pub security: bool,
    pub ack: bool,
    pub slotframe_length: u16,
    pub slot_duration: u16,
    pub sixtop_response: bool,
    pub uinject_period: u8,
    /// Slot offsets of the cells to the preferred parent.
    pub cells: Vec<u8>,
    pub neighbors: Vec<u16>,
    /// Packets bridged in from the host, oldest first.
    pub queue: VecDeque<Vec<u8>>,
}

impl From<&MoteConfig> for MoteState {
    fn from(config: &MoteConfig) -> Self {
        MoteState {
            is_sync: config.is_sync,
            is_root: config.is_root,
            pan_id: config.pan_id,
            dag_rank: config.dag_rank,
            channel: config.channel,
            ka_period: config.ka_period,
            eb_period: DEFAULT_EB_PERIOD_S,
            dio_period: DEFAULT_DIO_PERIOD_MS,
            dao_period: DEFAULT_DAO_PERIOD_MS,
            security: true,
            ack: true,
            slotframe_length: DEFAULT_SLOTFRAME_LENGTH,
            slot_duration: SLOT_DURATION.as_millis() as u16,
            sixtop_response: true,
            uinject_period: DEFAULT_UINJECT_PERIOD_S,
            cells: Vec::new(),
            neighbors: config.neighbors.clone(),
            queue: VecDeque::new(),
        }
    }
}

/// Simulated mote collaborators.
#[derive(Debug)]
pub struct SimMote {
    name: String,
    short_id: [u8; ADDR_16B_LEN],
    initial: MoteConfig,
    events: MoteHandle,
    boot: Mutex<Instant>,
    state: Mutex<MoteState>,
    led_toggles: AtomicU32,
    led_blinks: AtomicU32,
    resets: AtomicU32,
    bridged: AtomicU64,
}

impl SimMote {
    /// Mote with the identity and initial state from `config`.
    pub fn new(config: &RunnerConfig, events: MoteHandle) -> Self {
        SimMote {
            name: format!("Mote[{:04x}]", config.device_id),
            short_id: config.short_id(),
            initial: config.mote.clone(),
            events,
            boot: Mutex::new(Instant::now()),
            state: Mutex::new(MoteState::from(&config.mote)),
            led_toggles: AtomicU32::new(0),
            led_blinks: AtomicU32::new(0),
            resets: AtomicU32::new(0),
            bridged: AtomicU64::new(0),
        }
    }

    /// Snapshot of the stack state.
    pub fn state(&self) -> MoteState {
        self.state.lock().clone()
    }

    /// Slots elapsed since boot.
    pub fn slot_count(&self) -> u64 {
        let elapsed = self.boot.lock().elapsed();
        (elapsed.as_millis() / SLOT_DURATION.as_millis()) as u64
    }

    /// Error LED toggles so far.
    pub fn led_toggles(&self) -> u32 {
        self.led_toggles.load(Ordering::Relaxed)
    }

    /// Error LED blinks so far.
    pub fn led_blinks(&self) -> u32 {
        self.led_blinks.load(Ordering::Relaxed)
    }

    /// Board resets requested so far.
    pub fn resets(&self) -> u32 {
        self.resets.load(Ordering::Relaxed)
    }

    /// Packets bridged in from the host so far.
    pub fn bridged(&self) -> u64 {
        self.bridged.load(Ordering::Relaxed)
    }

    /// Return to the boot state after a board reset.
    pub fn on_reset(&self) {
        *self.boot.lock() = Instant::now();
        *self.state.lock() = MoteState::from(&self.initial);
    }

    fn apply_sixtop(
        &self,
        state: &mut MoteState,
        operation: SixtopOperation,
        slot_offsets: Vec<u8>,
    ) {
        if !state.is_sync || state.neighbors.is_empty() {
            warn!("{}: 6P {:?} ignored, no parent", self.name, operation);
            return;
        }
        match operation {
            SixtopOperation::Add => {
                let offsets = if slot_offsets.is_empty() {
                    // Random cell: first free offset after the shared slot
                    (1..=u8::MAX).find(|o| !state.cells.contains(o)).into_iter().collect()
                } else {
                    slot_offsets
                };
                for offset in offsets {
                    if !state.cells.contains(&offset) {
                        state.cells.push(offset);
                    }
                }
            }
            SixtopOperation::Delete => {
                if slot_offsets.is_empty() {
                    state.cells.pop();
                } else {
                    state.cells.retain(|o| !slot_offsets.contains(o));
                }
            }
            SixtopOperation::Clear => state.cells.clear(),
            SixtopOperation::Count => {
                info!("{}: 6P count: {} cells", self.name, state.cells.len());
            }
            SixtopOperation::List => {
                info!("{}: 6P list: {:?}", self.name, state.cells);
            }
        }
    }
}

impl MoteServices for SimMote {
    fn my_short_id(&self) -> [u8; ADDR_16B_LEN] {
        self.short_id
    }

    fn asn(&self) -> [u8; ASN_LEN] {
        let bytes = self.slot_count().to_le_bytes();
        let mut asn = [0u8; ASN_LEN];
        asn.copy_from_slice(&bytes[..ASN_LEN]);
        asn
    }

    fn error_led_toggle(&self) {
        let n = self.led_toggles.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("{}: Error LED toggled ({})", self.name, n);
    }

    fn error_led_blink(&self) {
        self.led_blinks.fetch_add(1, Ordering::Relaxed);
        warn!("{}: Error LED blinking", self.name);
    }

    fn board_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
        if self.events.send(MoteEvent::BoardReset).is_err() {
            warn!("{}: Actor stopped, reset lost", self.name);
        }
    }

    fn start_oneshot(&self, delay: Duration, callback: TimerCallback) {
        debug!("{}: One-shot timer in {:?}", self.name, delay);
        if self.events.schedule(delay, MoteEvent::Timer(callback)).is_err() {
            warn!("{}: Actor stopped, timer lost", self.name);
        }
    }

    fn trigger_about_root(&self) {
        let mut state = self.state.lock();
        state.is_root = !state.is_root;
        if state.is_root {
            state.dag_rank = 256;
            state.is_sync = true;
        } else {
            state.dag_rank = self.initial.dag_rank;
        }
        info!("{}: DAG root {}", self.name, if state.is_root { "on" } else { "off" });
    }

    fn bridge_data(&self, payload: &[u8]) {
        self.bridged.fetch_add(1, Ordering::Relaxed);
        debug!("{}: Bridged {}", self.name, hex::encode(payload));
        let mut state = self.state.lock();
        if state.queue.len() == BRIDGE_QUEUE_LEN {
            warn!("{}: Bridge queue full, oldest packet dropped", self.name);
            state.queue.pop_front();
        }
        state.queue.push_back(payload.to_vec());
    }

    fn apply_command(&self, command: StackCommand) {
        info!("{}: Command {:?}", self.name, command);
        let mut state = self.state.lock();
        match command {
            StackCommand::SetEbPeriod(v) => state.eb_period = v,
            StackCommand::SetChannel(v) => state.channel = v,
            StackCommand::SetKaPeriod(v) => state.ka_period = v,
            StackCommand::SetDioPeriod(v) => state.dio_period = v,
            StackCommand::SetDaoPeriod(v) => state.dao_period = v,
            StackCommand::SetDagRank(v) => state.dag_rank = v,
            StackCommand::SetSecurity(v) => state.security = v,
            StackCommand::SetSlotframeLength(v) => state.slotframe_length = v,
            StackCommand::SetAck(v) => state.ack = v,
            StackCommand::SetSlotDuration(v) => state.slot_duration = v,
            StackCommand::SetSixtopResponse(v) => state.sixtop_response = v,
            StackCommand::SetUinjectPeriod(v) => state.uinject_period = v,
            StackCommand::Sixtop {
                operation,
                slot_offsets,
            } => self.apply_sixtop(&mut state, operation, slot_offsets),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mote(config: RunnerConfig) -> SimMote {
        let (events, _inbox) = MoteHandle::channel();
        SimMote::new(&config, events)
    }

    fn synced_with_parent() -> RunnerConfig {
        let mut config = RunnerConfig::default();
        config.mote.neighbors = vec![0x0002];
        config
    }

    #[test]
    fn test_identity_and_asn() {
        let config = RunnerConfig {
            device_id: 0x1020,
            ..Default::default()
        };
        let mote = mote(config);
        assert_eq!(mote.my_short_id(), [0x10, 0x20]);
        assert_eq!(mote.asn()[3..], [0, 0]);
    }

    #[test]
    fn test_commands_update_state() {
        let mote = mote(RunnerConfig::default());
        mote.apply_command(StackCommand::SetChannel(17));
        mote.apply_command(StackCommand::SetDagRank(1024));
        mote.apply_command(StackCommand::SetAck(false));
        let state = mote.state();
        assert_eq!(state.channel, 17);
        assert_eq!(state.dag_rank, 1024);
        assert!(!state.ack);
    }

    #[test]
    fn test_sixtop_cells() {
        let mote = mote(synced_with_parent());
        let add = |slot_offsets: Vec<u8>| StackCommand::Sixtop {
            operation: SixtopOperation::Add,
            slot_offsets,
        };
        mote.apply_command(add(vec![]));
        mote.apply_command(add(vec![5, 7]));
        assert_eq!(mote.state().cells, vec![1, 5, 7]);

        mote.apply_command(StackCommand::Sixtop {
            operation: SixtopOperation::Delete,
            slot_offsets: vec![5],
        });
        assert_eq!(mote.state().cells, vec![1, 7]);

        mote.apply_command(StackCommand::Sixtop {
            operation: SixtopOperation::Clear,
            slot_offsets: vec![],
        });
        assert!(mote.state().cells.is_empty());
    }

    #[test]
    fn test_sixtop_needs_parent() {
        let mote = mote(RunnerConfig::default());
        mote.apply_command(StackCommand::Sixtop {
            operation: SixtopOperation::Add,
            slot_offsets: vec![3],
        });
        assert!(mote.state().cells.is_empty());
    }

    #[test]
    fn test_bridge_queue_drops_oldest() {
        let mote = mote(RunnerConfig::default());
        for i in 0..=BRIDGE_QUEUE_LEN as u8 {
            mote.bridge_data(&[i]);
        }
        let state = mote.state();
        assert_eq!(state.queue.len(), BRIDGE_QUEUE_LEN);
        assert_eq!(state.queue.front(), Some(&vec![1]));
        assert_eq!(mote.bridged(), BRIDGE_QUEUE_LEN as u64 + 1);
    }

    #[test]
    fn test_root_toggle_and_reset() {
        let mote = mote(RunnerConfig::default());
        mote.trigger_about_root();
        assert!(mote.state().is_root);
        assert_eq!(mote.state().dag_rank, 256);

        mote.apply_command(StackCommand::SetChannel(20));
        mote.on_reset();
        assert_eq!(mote.state(), MoteState::from(&MoteConfig::default()));
    }
}
