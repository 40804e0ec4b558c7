//! Metrics for the mote serial transport.
//!
//! This crate declares every metric the transport records as a structured
//! [`Metric`] constant, so names are not retyped at call sites. It re-exports
//! the `metrics` crate; without an installed recorder every call is a no-op.
//!
//! # Example
//!
//! ```rust,ignore
//! use openserial_metrics::{metric_defs, describe_metrics, MetricLabels};
//!
//! describe_metrics();
//!
//! let labels = MetricLabels::new("10:20");
//! metrics::counter!(metric_defs::TX_FRAMES.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, Unit};

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use openserial_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const FRAMES: Metric = Metric::counter("openserial.tx.frames")
///     .with_description("Frames queued")
///     .with_unit(Unit::Count)
///     .with_labels(&["mote"]);
///
/// assert_eq!(FRAMES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "openserial.tx.frames").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description)
            }
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Gauge, Some(unit)) => describe_gauge!(self.name, unit, self.description),
            (MetricKind::Gauge, None) => describe_gauge!(self.name, self.description),
        }
    }
}

/// All metric definitions for the serial transport.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on every transport metric.
    pub const STANDARD_LABELS: &[&str] = &["mote"];

    /// Labels for per-command breakdown.
    pub const COMMAND_LABELS: &[&str] = &["mote", "command"];

    // ========================================================================
    // Output path
    // ========================================================================

    /// Frames accepted into the output buffer.
    pub const TX_FRAMES: Metric = Metric::counter("openserial.tx.frames")
        .with_description("Frames accepted into the output buffer")
        .with_unit(Unit::Count)
        .with_labels(STANDARD_LABELS);

    /// Bytes handed to the UART.
    pub const TX_BYTES: Metric = Metric::counter("openserial.tx.bytes")
        .with_description("Bytes drained to the UART")
        .with_unit(Unit::Bytes)
        .with_labels(STANDARD_LABELS);

    /// Frames dropped because the output buffer was full.
    pub const TX_DROPPED_FRAMES: Metric = Metric::counter("openserial.tx.dropped_frames")
        .with_description("Frames dropped because the output buffer was full")
        .with_unit(Unit::Count)
        .with_labels(STANDARD_LABELS);

    /// Output buffer occupancy after each enqueue.
    pub const TX_BUFFER_FILL: Metric = Metric::gauge("openserial.tx.buffer_fill")
        .with_description("Bytes pending in the output buffer")
        .with_unit(Unit::Bytes)
        .with_labels(STANDARD_LABELS);

    // ========================================================================
    // Input path
    // ========================================================================

    /// Valid frames received.
    pub const RX_FRAMES: Metric = Metric::counter("openserial.rx.frames")
        .with_description("Valid frames received")
        .with_unit(Unit::Count)
        .with_labels(STANDARD_LABELS);

    /// Frames dropped for a bad CRC.
    pub const RX_CRC_ERRORS: Metric = Metric::counter("openserial.rx.crc_errors")
        .with_description("Inbound frames dropped for a bad CRC")
        .with_unit(Unit::Count)
        .with_labels(STANDARD_LABELS);

    /// Frames dropped because they overflowed the input buffer.
    pub const RX_OVERFLOWS: Metric = Metric::counter("openserial.rx.overflows")
        .with_description("Inbound frames larger than the input buffer")
        .with_unit(Unit::Count)
        .with_labels(STANDARD_LABELS);

    /// Commands dispatched, per identifier.
    pub const RX_COMMANDS: Metric = Metric::counter("openserial.rx.commands")
        .with_description("Inbound commands dispatched")
        .with_unit(Unit::Count)
        .with_labels(COMMAND_LABELS);

    /// Returns a slice of all defined metrics.
    pub const ALL: &[&Metric] = &[
        &TX_FRAMES,
        &TX_BYTES,
        &TX_DROPPED_FRAMES,
        &TX_BUFFER_FILL,
        &RX_FRAMES,
        &RX_CRC_ERRORS,
        &RX_OVERFLOWS,
        &RX_COMMANDS,
    ];
}

/// Labels identifying the mote a metric belongs to.
#[derive(Debug, Clone)]
pub struct MetricLabels {
    /// Mote short address, formatted for display.
    pub mote: String,
}

impl MetricLabels {
    /// Creates labels for the given mote.
    pub fn new(mote: impl Into<String>) -> Self {
        Self { mote: mote.into() }
    }

    /// Labels for a 16-bit short address, formatted `hi:lo`.
    pub fn for_device(device_id: [u8; 2]) -> Self {
        Self::new(format!("{:02x}:{:02x}", device_id[0], device_id[1]))
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("mote", self.mote.clone())]
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describes all transport metrics.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::TX_FRAMES.name, "openserial.tx.frames");
        assert_eq!(metric_defs::TX_BYTES.unit, Some(Unit::Bytes));
        assert_eq!(metric_defs::TX_BUFFER_FILL.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::RX_COMMANDS.labels, &["mote", "command"]);
        assert_eq!(metric_defs::ALL.len(), 8);
    }

    #[test]
    fn test_labels_for_device() {
        let labels = MetricLabels::for_device([0x10, 0x2a]);
        assert_eq!(labels.to_labels(), vec![("mote", "10:2a".to_string())]);

        let extended = labels.with(&[("command", "S".to_string())]);
        assert_eq!(extended.len(), 2);
        assert!(extended.contains(&("command", "S".to_string())));
    }

    #[test]
    fn test_metric_minimal() {
        const MINIMAL: Metric = Metric::counter("minimal");

        assert_eq!(MINIMAL.kind, MetricKind::Counter);
        assert_eq!(MINIMAL.description, "");
        assert_eq!(MINIMAL.unit, None);
        assert_eq!(MINIMAL.labels, &[] as &[&str]);
    }
}
