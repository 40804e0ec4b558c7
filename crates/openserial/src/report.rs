//! Outbound reports.
//!
//! Every report is encoded in one go into the output ring and then drained
//! in the background. A report that does not fit is dropped and counted.

use openserial_protocol::{
    Severity, SERFRAME_MOTE2PC_DATA, SERFRAME_MOTE2PC_PRINTF, SERFRAME_MOTE2PC_SNIFFED_PACKET,
    SERFRAME_MOTE2PC_STATUS,
};

use crate::services::MoteServices;
use crate::OpenSerial;

impl OpenSerial {
    /// Send a status element: `[S, id0, id1, element, payload…]`.
    pub fn print_status(&self, element: u8, payload: &[u8]) {
        let id = self.services().my_short_id();
        self.enqueue(|out| {
            out.write_all(&[SERFRAME_MOTE2PC_STATUS, id[0], id[1], element]);
            out.write_all(payload);
        });
    }

    /// Send an informational report.
    pub fn print_info(&self, component: u8, code: u8, arg1: u16, arg2: u16) {
        log::debug!("info component={} code={} args=({}, {})", component, code, arg1, arg2);
        self.print_report(Severity::Info, component, code, arg1, arg2);
    }

    /// Send an error report and toggle the error LED.
    pub fn print_error(&self, component: u8, code: u8, arg1: u16, arg2: u16) {
        log::warn!("error component={} code={} args=({}, {})", component, code, arg1, arg2);
        self.services().error_led_toggle();
        self.print_report(Severity::Error, component, code, arg1, arg2);
    }

    /// Send a critical report, blink the error LED and schedule a board
    /// reset after the configured delay.
    pub fn print_critical(&self, component: u8, code: u8, arg1: u16, arg2: u16) {
        let delay = self.config().critical_reset_delay();
        log::error!(
            "critical component={} code={} args=({}, {}), reset in {:?}",
            component,
            code,
            arg1,
            arg2,
            delay
        );
        self.services().error_led_blink();
        let services = self.services_arc();
        self.services()
            .start_oneshot(delay, Box::new(move || reset_board(services.as_ref())));
        self.print_report(Severity::Critical, component, code, arg1, arg2);
    }

    fn print_report(&self, severity: Severity, component: u8, code: u8, arg1: u16, arg2: u16) {
        let id = self.services().my_short_id();
        let [a1_hi, a1_lo] = arg1.to_be_bytes();
        let [a2_hi, a2_lo] = arg2.to_be_bytes();
        self.enqueue(|out| {
            out.write_all(&[
                severity.tag(),
                id[0],
                id[1],
                component,
                code,
                a1_hi,
                a1_lo,
                a2_hi,
                a2_lo,
            ]);
        });
    }

    /// Send data to the host: `[D, id1, id0, asn(5), payload…]`.
    pub fn print_data(&self, payload: &[u8]) {
        let id = self.services().my_short_id();
        let asn = self.services().asn();
        self.enqueue(|out| {
            out.write_all(&[SERFRAME_MOTE2PC_DATA, id[1], id[0]]);
            out.write_all(&asn);
            out.write_all(payload);
        });
    }

    /// Send an overheard packet: `[P, id1, id0, packet…, channel]`.
    pub fn print_sniffed_packet(&self, packet: &[u8], channel: u8) {
        let id = self.services().my_short_id();
        self.enqueue(|out| {
            out.write_all(&[SERFRAME_MOTE2PC_SNIFFED_PACKET, id[1], id[0]]);
            out.write_all(packet);
            out.write_byte(channel);
        });
    }

    /// Send free-form text: `[F, id0, id1, asn(5), text…]`.
    pub fn print_str(&self, text: &str) {
        let id = self.services().my_short_id();
        let asn = self.services().asn();
        self.enqueue(|out| {
            out.write_all(&[SERFRAME_MOTE2PC_PRINTF, id[0], id[1]]);
            out.write_all(&asn);
            out.write_all(text.as_bytes());
        });
    }
}

fn reset_board(services: &dyn MoteServices) {
    log::warn!("critical report timer expired, resetting board");
    services.board_reset();
}
