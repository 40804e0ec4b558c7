//! The transport instance.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use openserial_metrics::{metric_defs, metrics, MetricLabels};
use openserial_protocol::{
    COMPONENT_OPENSERIAL, ERR_GETDATA_ASKS_TOO_FEW_BYTES, ERR_INPUT_BUFFER_OVERFLOW,
    ERR_OUTPUT_BUFFER_OVERFLOW, ERR_WRONG_CRC_INPUT, SERIAL_INPUT_BUFFER_SIZE,
};
use parking_lot::Mutex;

use crate::config::SerialConfig;
use crate::debug_print::{DebugScheduler, StatusReporter};
use crate::dispatch::{self, command_label, CommandHandler, CommandTable};
use crate::error::ConfigError;
use crate::input::{InputAssembler, RxEvent};
use crate::output::{DrainStep, OutputChannel};
use crate::services::{MoteServices, Uart};
use crate::stats::{SerialStats, StatsCounters};

/// Host-facing serial transport of one mote.
///
/// All operations take `&self`; share the instance through an [`Arc`]
/// between the mainline and the two interrupt entry points
/// ([`isr_tx`](Self::isr_tx) and [`isr_rx`](Self::isr_rx)).
///
/// The output and input sides are separate critical sections and are never
/// held at the same time. Collaborators and handlers are always called with
/// the input side released.
pub struct OpenSerial {
    config: SerialConfig,
    uart: Arc<dyn Uart>,
    services: Arc<dyn MoteServices>,
    output: Mutex<OutputChannel>,
    input: Mutex<InputAssembler>,
    commands: Mutex<CommandTable>,
    debug: DebugScheduler,
    stats: StatsCounters,
    device: MetricLabels,
    labels: Vec<(&'static str, String)>,
}

impl std::fmt::Debug for OpenSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSerial")
            .field("config", &self.config)
            .field("reporters", &self.debug.len())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl OpenSerial {
    /// Build the transport and unmask the UART interrupts.
    pub fn new(
        config: SerialConfig,
        uart: Arc<dyn Uart>,
        services: Arc<dyn MoteServices>,
        reporters: Vec<Box<dyn StatusReporter>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let device = MetricLabels::for_device(services.my_short_id());
        let serial = OpenSerial {
            commands: Mutex::new(CommandTable::new(config.command_slots)),
            config,
            uart,
            services,
            output: Mutex::new(OutputChannel::new()),
            input: Mutex::new(InputAssembler::new()),
            debug: DebugScheduler::new(reporters),
            stats: StatsCounters::default(),
            labels: device.to_labels(),
            device,
        };
        serial.uart.enable_interrupts();
        Ok(serial)
    }

    /// Return buffers, flow control and the debug counter to their initial
    /// state. Registered commands are kept.
    ///
    /// A byte already on the wire is forgotten, not waited for. The caller
    /// must discard any transmit-complete event still pending for it;
    /// delivering one to [`isr_tx`](Self::isr_tx) after the reset would
    /// start a second byte while the first is still in flight.
    pub fn reinit(&self) {
        *self.output.lock() = OutputChannel::new();
        self.input.lock().reset();
        self.debug.reset();
        // Line must match the fresh, uninhibited state
        self.uart.set_cts(true);
        self.uart.enable_interrupts();
    }

    pub(crate) fn services(&self) -> &dyn MoteServices {
        self.services.as_ref()
    }

    pub(crate) fn services_arc(&self) -> Arc<dyn MoteServices> {
        Arc::clone(&self.services)
    }

    pub(crate) fn commands(&self) -> &Mutex<CommandTable> {
        &self.commands
    }

    /// Active configuration.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    // ===== output

    /// Encode one frame into the output ring, then try to drain.
    ///
    /// `fill` writes the frame content through the encoder.
    pub(crate) fn enqueue(&self, fill: impl FnOnce(&mut OutputChannel)) {
        let (accepted, pending, step, dropped) = {
            let mut out = self.output.lock();
            out.open_frame();
            fill(&mut out);
            let accepted = out.close_frame();
            let step = out.flush(self.uart.as_ref());
            // A frame larger than the whole ring: nothing will drain to report it
            let dropped = if !accepted && out.is_empty() && !out.is_busy() {
                out.take_dropped_frames()
            } else {
                0
            };
            (accepted, out.pending(), step, dropped)
        };

        if accepted {
            StatsCounters::bump(&self.stats.frames_sent);
            metrics::counter!(metric_defs::TX_FRAMES.name, &self.labels).increment(1);
        } else {
            StatsCounters::bump(&self.stats.output_drops);
            metrics::counter!(metric_defs::TX_DROPPED_FRAMES.name, &self.labels).increment(1);
            log::warn!("output buffer full, frame dropped ({} bytes pending)", pending);
        }
        metrics::gauge!(metric_defs::TX_BUFFER_FILL.name, &self.labels).set(pending as f64);
        self.record_step(step);
        self.report_output_drops(dropped);
    }

    fn report_output_drops(&self, dropped: u32) {
        if dropped > 0 {
            self.print_error(
                COMPONENT_OPENSERIAL,
                ERR_OUTPUT_BUFFER_OVERFLOW,
                dropped.min(u16::MAX as u32) as u16,
                0,
            );
        }
    }

    fn record_step(&self, step: DrainStep) {
        if step == DrainStep::Sent {
            self.stats.bytes_drained.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(metric_defs::TX_BYTES.name, &self.labels).increment(1);
        }
    }

    /// Try to make progress on the output side.
    ///
    /// Signals a pending flow-control change, or sends one byte. Never
    /// blocks; further bytes follow from [`isr_tx`](Self::isr_tx).
    pub fn flush(&self) {
        let step = self.output.lock().flush(self.uart.as_ref());
        self.record_step(step);
    }

    /// Tell the peer to stop sending and stop draining.
    pub fn inhibit_start(&self) {
        self.output.lock().inhibit_start();
        self.flush();
    }

    /// Tell the peer it may send again and resume draining.
    pub fn inhibit_stop(&self) {
        self.output.lock().inhibit_stop();
        self.flush();
    }

    /// Transmit-ready interrupt: the previous byte has left the UART.
    pub fn isr_tx(&self) {
        let (step, dropped) = {
            let mut out = self.output.lock();
            let step = out.on_tx_ready(self.uart.as_ref());
            let dropped = if out.is_empty() {
                out.take_dropped_frames()
            } else {
                0
            };
            (step, dropped)
        };
        self.record_step(step);
        self.report_output_drops(dropped);
    }

    /// Write and read indexes of the output ring.
    pub fn output_indexes(&self) -> (usize, usize) {
        self.output.lock().indexes()
    }

    /// Bytes waiting in the output ring.
    pub fn output_pending(&self) -> usize {
        self.output.lock().pending()
    }

    /// Whether draining is inhibited.
    pub fn is_inhibited(&self) -> bool {
        self.output.lock().is_inhibited()
    }

    // ===== input

    /// Receive interrupt: fetch the byte from the UART and process it.
    pub fn isr_rx(&self) {
        let byte = self.uart.read_byte();
        self.handle_rx_byte(byte);
    }

    /// Process one received byte.
    pub fn handle_rx_byte(&self, byte: u8) {
        let mut frame = [0u8; SERIAL_INPUT_BUFFER_SIZE];
        let (event, len) = {
            let mut input = self.input.lock();
            let event = input.receive(byte);
            let len = if event == RxEvent::FrameReady {
                let content = input.frame();
                frame[..content.len()].copy_from_slice(content);
                content.len()
            } else {
                0
            };
            (event, len)
        };

        match event {
            RxEvent::None => {}
            RxEvent::FrameReady => {
                let frame = &frame[..len];
                StatsCounters::bump(&self.stats.frames_received);
                metrics::counter!(metric_defs::RX_FRAMES.name, &self.labels).increment(1);
                let labels = self.device.with(&[("command", command_label(frame[0]))]);
                metrics::counter!(metric_defs::RX_COMMANDS.name, &labels).increment(1);
                log::debug!("rx command {} ({} bytes)", command_label(frame[0]), len);

                dispatch::dispatch(self, frame);
                self.input.lock().finish_frame();
            }
            RxEvent::Overflow { fill } => {
                StatsCounters::bump(&self.stats.input_overflows);
                metrics::counter!(metric_defs::RX_OVERFLOWS.name, &self.labels).increment(1);
                self.print_error(COMPONENT_OPENSERIAL, ERR_INPUT_BUFFER_OVERFLOW, fill as u16, 0);
            }
            RxEvent::InvalidFrame => {
                StatsCounters::bump(&self.stats.crc_failures);
                metrics::counter!(metric_defs::RX_CRC_ERRORS.name, &self.labels).increment(1);
                log::debug!("dropping inbound frame with bad CRC");
                self.print_error(COMPONENT_OPENSERIAL, ERR_WRONG_CRC_INPUT, 0, 0);
            }
        }
    }

    /// Register `handler` for command `id`.
    ///
    /// Re-registering an identifier replaces its handler. With every slot in
    /// use the oldest registration is dropped.
    pub fn register_command<F>(&self, id: u8, handler: F)
    where
        F: Fn(&OpenSerial, &[u8]) + Send + Sync + 'static,
    {
        let handler: CommandHandler = Arc::new(handler);
        if let Some(evicted) = self.commands.lock().register(id, handler) {
            log::debug!("command {} replaced by {}", command_label(evicted), command_label(id));
        }
    }

    /// Payload length of the frame being dispatched (command byte excluded).
    pub fn input_buffer_fill_level(&self) -> usize {
        self.input.lock().fill_level().saturating_sub(1)
    }

    /// Copy the payload of the frame being dispatched into `dst`.
    ///
    /// Returns the number of bytes copied. If `dst` is too small an error
    /// report is sent and nothing is copied.
    pub fn read_input_buffer(&self, dst: &mut [u8]) -> usize {
        let available = {
            let input = self.input.lock();
            let payload = input.frame().get(1..).unwrap_or(&[]);
            if dst.len() >= payload.len() {
                dst[..payload.len()].copy_from_slice(payload);
                return payload.len();
            }
            payload.len()
        };
        self.print_error(
            COMPONENT_OPENSERIAL,
            ERR_GETDATA_ASKS_TOO_FEW_BYTES,
            dst.len().min(u16::MAX as usize) as u16,
            available as u16,
        );
        0
    }

    // ===== debug

    /// Periodic debug tick: let the next reporter send a status frame.
    ///
    /// Skipped while the output ring still holds data; the skipped tick
    /// retries draining instead.
    pub fn trigger_debug_print(&self) {
        if self.output_pending() > 0 {
            self.flush();
            return;
        }
        self.debug.tick(self);
    }

    /// Current debug counter position.
    pub fn debug_counter(&self) -> usize {
        self.debug.counter()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> SerialStats {
        self.stats.snapshot()
    }
}
