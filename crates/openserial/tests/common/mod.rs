//! Shared test double for the transport integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use openserial::{MoteServices, OpenSerial, SerialConfig, StatusReporter, TimerCallback, Uart};
use openserial_protocol::{hdlc_frame, HdlcCodec, MoteFrame, StackCommand};
use parking_lot::Mutex;

pub const DEVICE_ID: [u8; 2] = [0x10, 0x20];
pub const ASN: [u8; 5] = [0x01, 0x02, 0x03, 0x04, 0x05];

/// What happened on the UART lines, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    Byte(u8),
    Cts(bool),
}

/// Records every UART and collaborator call.
#[derive(Default)]
pub struct MockPlatform {
    pub line: Mutex<Vec<LineEvent>>,
    pub rx_byte: Mutex<u8>,
    pub led_toggles: Mutex<u32>,
    pub led_blinks: Mutex<u32>,
    pub resets: Mutex<u32>,
    pub timers: Mutex<Vec<(Duration, TimerCallback)>>,
    pub root_triggers: Mutex<u32>,
    pub bridged: Mutex<Vec<Vec<u8>>>,
    pub applied: Mutex<Vec<StackCommand>>,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Bytes written to the UART so far.
    pub fn wire(&self) -> Vec<u8> {
        self.line
            .lock()
            .iter()
            .filter_map(|e| match e {
                LineEvent::Byte(b) => Some(*b),
                LineEvent::Cts(_) => None,
            })
            .collect()
    }

    /// Flow-control levels driven so far.
    pub fn cts_levels(&self) -> Vec<bool> {
        self.line
            .lock()
            .iter()
            .filter_map(|e| match e {
                LineEvent::Cts(level) => Some(*level),
                LineEvent::Byte(_) => None,
            })
            .collect()
    }

    /// Frames decoded from everything written so far.
    pub fn frames(&self) -> Vec<MoteFrame> {
        let mut codec = HdlcCodec::new();
        codec.push(&self.wire());
        let mut frames = Vec::new();
        while let Some(content) = codec.decode() {
            frames.push(MoteFrame::decode(&content).expect("valid mote frame"));
        }
        assert_eq!(codec.crc_errors(), 0, "mote sent a frame with a bad CRC");
        frames
    }

    pub fn clear_line(&self) {
        self.line.lock().clear();
    }
}

impl Uart for MockPlatform {
    fn write_byte(&self, byte: u8) {
        self.line.lock().push(LineEvent::Byte(byte));
    }

    fn set_cts(&self, clear_to_send: bool) {
        self.line.lock().push(LineEvent::Cts(clear_to_send));
    }

    fn read_byte(&self) -> u8 {
        *self.rx_byte.lock()
    }
}

impl MoteServices for MockPlatform {
    fn my_short_id(&self) -> [u8; 2] {
        DEVICE_ID
    }

    fn asn(&self) -> [u8; 5] {
        ASN
    }

    fn error_led_toggle(&self) {
        *self.led_toggles.lock() += 1;
    }

    fn error_led_blink(&self) {
        *self.led_blinks.lock() += 1;
    }

    fn board_reset(&self) {
        *self.resets.lock() += 1;
    }

    fn start_oneshot(&self, delay: Duration, callback: TimerCallback) {
        self.timers.lock().push((delay, callback));
    }

    fn trigger_about_root(&self) {
        *self.root_triggers.lock() += 1;
    }

    fn bridge_data(&self, payload: &[u8]) {
        self.bridged.lock().push(payload.to_vec());
    }

    fn apply_command(&self, command: StackCommand) {
        self.applied.lock().push(command);
    }
}

/// Transport wired to `platform` for both UART and services.
pub fn transport(
    platform: &Arc<MockPlatform>,
    config: SerialConfig,
    reporters: Vec<Box<dyn StatusReporter>>,
) -> Arc<OpenSerial> {
    let serial = OpenSerial::new(config, platform.clone(), platform.clone(), reporters)
        .expect("valid config");
    Arc::new(serial)
}

/// Fire transmit-ready until nothing more is sent.
pub fn drain(serial: &OpenSerial, platform: &MockPlatform) {
    loop {
        let before = platform.line.lock().len();
        serial.isr_tx();
        if platform.line.lock().len() == before {
            break;
        }
    }
}

/// Deliver raw bytes through the receive interrupt.
pub fn receive(serial: &OpenSerial, platform: &MockPlatform, bytes: &[u8]) {
    for byte in bytes {
        *platform.rx_byte.lock() = *byte;
        serial.isr_rx();
    }
}

/// Deliver one framed command.
pub fn send_frame(serial: &OpenSerial, platform: &MockPlatform, content: &[u8]) {
    receive(serial, platform, &hdlc_frame(content));
}
