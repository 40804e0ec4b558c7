//! Status reporters of the simulated mote, in status-element order.

use std::sync::Arc;

use openserial::{MoteServices, OpenSerial, OutBufferIndexesReporter, StatusReporter};
use openserial_protocol::{
    STATUS_ASN, STATUS_BACKOFF, STATUS_DAGRANK, STATUS_ID, STATUS_ISSYNC, STATUS_KAPERIOD,
    STATUS_MACSTATS, STATUS_NEIGHBORS, STATUS_QUEUE, STATUS_SCHEDULE,
};

use crate::sim_mote::SimMote;

/// One reporter per status element, indexed by element id.
///
/// Reporters that have nothing to say decline: the clock and MAC elements
/// while unsynchronized, the schedule, queue and neighbor elements while
/// empty.
pub fn status_reporters(mote: &Arc<SimMote>) -> Vec<Box<dyn StatusReporter>> {
    let reporter = |f: fn(&SimMote, &OpenSerial) -> bool| -> Box<dyn StatusReporter> {
        let mote = Arc::clone(mote);
        Box::new(move |serial: &OpenSerial| f(&mote, serial))
    };

    vec![
        reporter(is_sync),
        reporter(id),
        reporter(dag_rank),
        Box::new(OutBufferIndexesReporter),
        reporter(asn),
        reporter(mac_stats),
        reporter(schedule),
        reporter(backoff),
        reporter(queue),
        reporter(neighbors),
        reporter(ka_period),
    ]
}

fn is_sync(mote: &SimMote, serial: &OpenSerial) -> bool {
    serial.print_status(STATUS_ISSYNC, &[mote.state().is_sync as u8]);
    true
}

fn id(mote: &SimMote, serial: &OpenSerial) -> bool {
    let state = mote.state();
    let mut payload = vec![state.is_root as u8];
    payload.extend_from_slice(&state.pan_id.to_le_bytes());
    payload.extend_from_slice(&mote.my_short_id());
    serial.print_status(STATUS_ID, &payload);
    true
}

fn dag_rank(mote: &SimMote, serial: &OpenSerial) -> bool {
    serial.print_status(STATUS_DAGRANK, &mote.state().dag_rank.to_le_bytes());
    true
}

fn asn(mote: &SimMote, serial: &OpenSerial) -> bool {
    if !mote.state().is_sync {
        return false;
    }
    serial.print_status(STATUS_ASN, &mote.asn());
    true
}

fn mac_stats(mote: &SimMote, serial: &OpenSerial) -> bool {
    let state = mote.state();
    if !state.is_sync {
        return false;
    }
    let mut payload = vec![state.channel];
    payload.extend_from_slice(&state.slotframe_length.to_le_bytes());
    payload.extend_from_slice(&state.slot_duration.to_le_bytes());
    payload.push(state.cells.len() as u8);
    serial.print_status(STATUS_MACSTATS, &payload);
    true
}

fn schedule(mote: &SimMote, serial: &OpenSerial) -> bool {
    let state = mote.state();
    if state.cells.is_empty() {
        return false;
    }
    serial.print_status(STATUS_SCHEDULE, &state.cells);
    true
}

fn backoff(mote: &SimMote, serial: &OpenSerial) -> bool {
    if !mote.state().is_sync {
        return false;
    }
    // exponent, counter
    serial.print_status(STATUS_BACKOFF, &[1, 0]);
    true
}

fn queue(mote: &SimMote, serial: &OpenSerial) -> bool {
    let state = mote.state();
    if state.queue.is_empty() {
        return false;
    }
    let payload: Vec<u8> = std::iter::once(state.queue.len() as u8)
        .chain(state.queue.iter().map(|p| p.len().min(u8::MAX as usize) as u8))
        .collect();
    serial.print_status(STATUS_QUEUE, &payload);
    true
}

fn neighbors(mote: &SimMote, serial: &OpenSerial) -> bool {
    let state = mote.state();
    if state.neighbors.is_empty() {
        return false;
    }
    let payload: Vec<u8> = state.neighbors.iter().flat_map(|n| n.to_be_bytes()).collect();
    serial.print_status(STATUS_NEIGHBORS, &payload);
    true
}

fn ka_period(mote: &SimMote, serial: &OpenSerial) -> bool {
    serial.print_status(STATUS_KAPERIOD, &mote.state().ka_period.to_le_bytes());
    true
}
