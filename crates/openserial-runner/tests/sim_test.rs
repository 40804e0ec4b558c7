//! End-to-end tests of the simulated mote: actor, simulated UART and TCP bridge.

use std::time::{Duration, Instant};

use openserial_protocol::{
    hdlc_frame, HdlcCodec, HostCommand, MoteFrame, Severity, StackCommand, STATUS_DAGRANK,
    STATUS_ID,
};
use openserial_runner::{
    spawn_mote, HostLink, HostPort, MoteEvent, MoteThread, RunnerConfig, UartBridge,
};
use serial_test::serial;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Helpers
// ============================================================================

/// Host end of the link, decoding what the mote sends.
struct Host {
    port: HostPort,
    codec: HdlcCodec,
}

impl Host {
    fn next_frame(&mut self, timeout: Duration) -> Option<MoteFrame> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(content) = self.codec.decode() {
                return Some(MoteFrame::decode(&content).expect("valid mote frame"));
            }
            match self.port.try_recv() {
                Some(bytes) => self.codec.push(&bytes),
                None if Instant::now() >= deadline => return None,
                None => std::thread::sleep(Duration::from_millis(1)),
            }
        }
    }
}

fn unpaced() -> RunnerConfig {
    RunnerConfig {
        device_id: 0x1020,
        baud: 0,
        debug_period_ms: 0,
        ..Default::default()
    }
}

fn start(config: &RunnerConfig) -> (MoteThread, Host) {
    let (link, port) = HostLink::new_pair();
    port.set_connected(true);
    let mote = spawn_mote(config, link).expect("mote starts");
    let host = Host {
        port,
        codec: HdlcCodec::new(),
    };
    (mote, host)
}

fn send(mote: &MoteThread, command: HostCommand) {
    mote.events()
        .send(MoteEvent::RxBytes(hdlc_frame(&command.encode())))
        .expect("actor running");
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

// ============================================================================
// Actor
// ============================================================================

#[test]
fn test_echo_through_actor() {
    let (mote, mut host) = start(&unpaced());

    send(&mote, HostCommand::TriggerEcho(vec![0x41, 0x42]));

    match host.next_frame(TIMEOUT) {
        Some(MoteFrame::Data { device_id, payload, .. }) => {
            assert_eq!(device_id, [0x10, 0x20]);
            assert_eq!(payload, vec![0x41, 0x42]);
        }
        other => panic!("expected data frame, got {:?}", other),
    }
    assert_eq!(mote.serial().stats().frames_received, 1);

    mote.shutdown().unwrap();
}

#[test]
fn test_debug_ticks_send_status() {
    let config = RunnerConfig {
        debug_period_ms: 20,
        ..unpaced()
    };
    let (mote, mut host) = start(&config);

    let mut elements = Vec::new();
    while elements.len() < 2 {
        match host.next_frame(TIMEOUT) {
            Some(MoteFrame::Status { element, .. }) => elements.push(element),
            other => panic!("expected status frame, got {:?}", other),
        }
    }
    // Counter advances before the first report
    assert_eq!(elements, vec![STATUS_ID, STATUS_DAGRANK]);

    mote.shutdown().unwrap();
}

#[test]
fn test_stack_command_updates_state() {
    let (mote, _host) = start(&unpaced());

    send(&mote, HostCommand::Command(StackCommand::SetDagRank(1024)));
    send(&mote, HostCommand::Command(StackCommand::SetChannel(20)));

    assert!(wait_until(|| {
        let state = mote.mote().state();
        state.dag_rank == 1024 && state.channel == 20
    }));

    mote.shutdown().unwrap();
}

#[test]
fn test_reset_command_restores_boot_state() {
    let (mote, _host) = start(&unpaced());

    send(&mote, HostCommand::Command(StackCommand::SetChannel(20)));
    assert!(wait_until(|| mote.mote().state().channel == 20));

    send(&mote, HostCommand::Reset);
    assert!(wait_until(|| mote.mote().resets() == 1));
    assert!(wait_until(|| mote.mote().state().channel == 0));

    mote.shutdown().unwrap();
}

#[test]
fn test_critical_resets_after_delay() {
    let mut config = unpaced();
    config.serial.critical_reset_delay_ms = 50;
    let (mote, mut host) = start(&config);

    let reported = Instant::now();
    mote.serial().print_critical(0x01, 0x02, 3, 4);

    match host.next_frame(TIMEOUT) {
        Some(MoteFrame::Report(Severity::Critical, report)) => {
            assert_eq!(report.code, 0x02);
            assert_eq!(report.arg1, 3);
        }
        other => panic!("expected critical report, got {:?}", other),
    }
    assert_eq!(mote.mote().led_blinks(), 1);

    assert!(wait_until(|| mote.mote().resets() == 1));
    assert!(reported.elapsed() >= Duration::from_millis(50));

    mote.shutdown().unwrap();
}

#[test]
fn test_bytes_paced_by_baud_rate() {
    let config = RunnerConfig {
        baud: 9600,
        ..unpaced()
    };
    let (mote, mut host) = start(&config);
    let byte_time = config.byte_time();

    let started = Instant::now();
    mote.serial().print_status(7, &[0x01, 0x02]);
    assert!(matches!(host.next_frame(TIMEOUT), Some(MoteFrame::Status { element: 7, .. })));

    // Ten bytes on the wire, nine waits between them
    assert!(started.elapsed() >= byte_time * 9);
    assert!(wait_until(|| mote.serial().stats().bytes_drained == 10));

    mote.shutdown().unwrap();
}

#[test]
fn test_board_reset_mid_frame_restarts_cleanly() {
    let config = RunnerConfig {
        baud: 1200,
        ..unpaced()
    };
    let (mote, mut host) = start(&config);

    mote.serial().print_status(7, &[0x55; 20]);
    assert!(wait_until(|| mote.serial().stats().bytes_drained >= 3));
    mote.events().send(MoteEvent::BoardReset).expect("actor running");
    assert!(wait_until(|| mote.mote().resets() == 1));

    // The cut frame is closed by the next opening flag and fails its CRC
    mote.serial().print_status(9, &[0x01]);
    match host.next_frame(TIMEOUT) {
        Some(MoteFrame::Status { element, payload, .. }) => {
            assert_eq!(element, 9);
            assert_eq!(payload, vec![0x01]);
        }
        other => panic!("expected status frame, got {:?}", other),
    }
    assert_eq!(host.codec.crc_errors(), 1);

    mote.shutdown().unwrap();
}

#[test]
fn test_inhibit_drives_cts_line() {
    let (mote, mut host) = start(&unpaced());

    mote.serial().inhibit_start();
    assert!(!host.port.cts());

    mote.serial().print_status(7, &[]);
    assert!(host.next_frame(Duration::from_millis(50)).is_none());

    // The first flush only raises the line
    mote.serial().inhibit_stop();
    assert!(host.port.cts());
    mote.serial().flush();
    assert!(matches!(host.next_frame(TIMEOUT), Some(MoteFrame::Status { element: 7, .. })));

    mote.shutdown().unwrap();
}

// ============================================================================
// TCP bridge
// ============================================================================

#[tokio::test]
#[serial]
async fn test_bridge_echo_over_tcp() {
    let (link, port) = HostLink::new_pair();
    let mote = spawn_mote(&unpaced(), link).unwrap();
    let bridge = UartBridge::new(port, mote.events().clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(bridge.run(listener));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let echo = HostCommand::TriggerEcho(b"ping".to_vec());
    stream.write_all(&hdlc_frame(&echo.encode())).await.unwrap();

    let mut codec = HdlcCodec::new();
    let mut buf = [0u8; 256];
    let frame = tokio::time::timeout(TIMEOUT, async {
        loop {
            if let Some(content) = codec.decode() {
                return MoteFrame::decode(&content).unwrap();
            }
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "bridge closed the connection");
            codec.push(&buf[..n]);
        }
    })
    .await
    .expect("echo within timeout");

    match frame {
        MoteFrame::Data { payload, .. } => assert_eq!(payload, b"ping".to_vec()),
        other => panic!("expected data frame, got {:?}", other),
    }

    drop(stream);
    tokio::task::spawn_blocking(move || mote.shutdown())
        .await
        .unwrap()
        .unwrap();
}
