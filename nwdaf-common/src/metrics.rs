//! Prometheus metric names and helpers (spec §11 "Metrics").
//!
//! Every service exposes the same four counters under the same names, so a
//! single Grafana dashboard works across all of them regardless of which
//! NF/event pair a particular instance happens to be wired to.

use metrics::counter;

pub mod names {
    pub const MESSAGES_RECEIVED: &str = "messages_received";
    pub const MESSAGES_PROCESSED: &str = "messages_processed";
    pub const FAILURES: &str = "failures";
    pub const NOTIFICATIONS_SENT: &str = "notifications_sent";
}

/// Registers the description text for every counter this crate defines.
/// Call once at startup, after the Prometheus exporter is installed.
pub fn describe_all() {
    metrics::describe_counter!(
        names::MESSAGES_RECEIVED,
        metrics::Unit::Count,
        "Number of bus messages received"
    );
    metrics::describe_counter!(
        names::MESSAGES_PROCESSED,
        metrics::Unit::Count,
        "Number of bus messages successfully processed"
    );
    metrics::describe_counter!(
        names::FAILURES,
        metrics::Unit::Count,
        "Number of failures encountered, broken down by kind"
    );
    metrics::describe_counter!(
        names::NOTIFICATIONS_SENT,
        metrics::Unit::Count,
        "Number of notifications delivered downstream"
    );
}

/// The bus-facing error kinds a `failures` counter is broken down by (spec
/// §7 items 1–3).
#[derive(Debug, Clone, Copy)]
pub enum FailureKind {
    TransientBus,
    SchemaMismatch,
    MissingCorrelation,
    InvalidTransition,
    InferenceUnavailable,
    DownstreamHttp,
}

impl FailureKind {
    fn label(self) -> &'static str {
        match self {
            Self::TransientBus => "transient_bus",
            Self::SchemaMismatch => "schema_mismatch",
            Self::MissingCorrelation => "missing_correlation",
            Self::InvalidTransition => "invalid_transition",
            Self::InferenceUnavailable => "inference_unavailable",
            Self::DownstreamHttp => "downstream_http",
        }
    }
}

pub mod failures {
    use super::{FailureKind, counter, names};

    pub fn incr(kind: FailureKind) {
        counter!(names::FAILURES, "kind" => kind.label()).increment(1);
    }
}

/// Which plane a received message came off (spec §3 planes), for the
/// `messages_received` breakdown.
#[derive(Debug, Clone, Copy)]
pub enum MessageKind {
    Control,
    Data,
}

impl MessageKind {
    fn label(self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Data => "data",
        }
    }
}

pub mod messages_received {
    use super::{MessageKind, counter, names};

    pub fn incr(kind: MessageKind) {
        counter!(names::MESSAGES_RECEIVED, "plane" => kind.label()).increment(1);
    }
}

pub mod messages_processed {
    use super::{MessageKind, counter, names};

    pub fn incr(kind: MessageKind) {
        counter!(names::MESSAGES_PROCESSED, "plane" => kind.label()).increment(1);
    }
}

pub mod notifications_sent {
    use super::{counter, names};

    pub fn incr() {
        counter!(names::NOTIFICATIONS_SENT).increment(1);
    }
}

/// Emits a one-shot gauge-like info counter identifying which binary is
/// running, the way the reference component tags its Prometheus output.
pub fn component_info_metric(bin_name: &str) {
    counter!("component_info", "component" => bin_name.to_owned()).increment(1);
}
