//! Metrics recorded by the transport, captured with a local debugging recorder.

mod common;

use common::*;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use openserial::SerialConfig;
use openserial_protocol::{hdlc_frame, HostCommand};

/// One captured counter: name, sorted labels, value.
type CounterSample = (String, Vec<(String, String)>, u64);

fn counters(recorder: &DebuggingRecorder) -> Vec<CounterSample> {
    recorder
        .snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(key, _, _, value)| match value {
            DebugValue::Counter(count) => {
                let key = key.key();
                let mut labels: Vec<(String, String)> = key
                    .labels()
                    .map(|l| (l.key().to_string(), l.value().to_string()))
                    .collect();
                labels.sort();
                Some((key.name().to_string(), labels, count))
            }
            _ => None,
        })
        .collect()
}

fn counter(samples: &[CounterSample], name: &str) -> Option<(Vec<(String, String)>, u64)> {
    samples
        .iter()
        .find(|(n, _, _)| n == name)
        .map(|(_, labels, count)| (labels.clone(), *count))
}

fn mote_label() -> Vec<(String, String)> {
    vec![("mote".to_string(), "10:20".to_string())]
}

// ============================================================================
// Counters
// ============================================================================

#[test]
fn test_transport_metrics_carry_mote_label() {
    let recorder = DebuggingRecorder::new();
    let platform = MockPlatform::new();

    let bytes_drained = metrics::with_local_recorder(&recorder, || {
        let serial = transport(&platform, SerialConfig::default(), vec![]);

        // Accepted
        serial.print_status(7, &[0x01, 0x02]);
        drain(&serial, &platform);

        // Larger than the ring: dropped, then reported as an error frame
        serial.print_data(&[0u8; 300]);
        drain(&serial, &platform);

        // Bad CRC inbound, answered with an error frame
        let mut wire = hdlc_frame(&HostCommand::SetRoot.encode());
        wire[1] ^= 0x01;
        receive(&serial, &platform, &wire);
        drain(&serial, &platform);

        serial.stats().bytes_drained
    });

    let samples = counters(&recorder);
    assert_eq!(counter(&samples, "openserial.tx.frames"), Some((mote_label(), 3)));
    assert_eq!(counter(&samples, "openserial.tx.dropped_frames"), Some((mote_label(), 1)));
    assert_eq!(counter(&samples, "openserial.rx.crc_errors"), Some((mote_label(), 1)));
    assert_eq!(counter(&samples, "openserial.tx.bytes"), Some((mote_label(), bytes_drained)));
    assert_eq!(counter(&samples, "openserial.rx.frames"), None);
}

#[test]
fn test_received_command_labelled_by_id() {
    let recorder = DebuggingRecorder::new();
    let platform = MockPlatform::new();

    metrics::with_local_recorder(&recorder, || {
        let serial = transport(&platform, SerialConfig::default(), vec![]);
        send_frame(&serial, &platform, &HostCommand::TriggerEcho(vec![0x41]).encode());
        drain(&serial, &platform);
    });

    let samples = counters(&recorder);
    let expected = vec![
        ("command".to_string(), "S".to_string()),
        ("mote".to_string(), "10:20".to_string()),
    ];
    assert_eq!(counter(&samples, "openserial.rx.commands"), Some((expected, 1)));
    assert_eq!(counter(&samples, "openserial.rx.frames"), Some((mote_label(), 1)));
    // The echo goes out as a data frame
    assert_eq!(counter(&samples, "openserial.tx.frames"), Some((mote_label(), 1)));
}
