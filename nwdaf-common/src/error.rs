//! The error taxonomy of spec §7.
//!
//! None of these propagate to an end user as a structured error (spec §7
//! closing note); they exist so each service can log consistently and so
//! `main` has exactly one kind — [`FatalStartup`](Error::FatalStartup) —
//! that maps to a non-zero exit code (spec §6).

use thiserror::Error;

/// Bus-facing errors (spec §7 items 1–3).
#[derive(Debug, Error)]
pub enum BusError {
    /// Broker unavailable. Policy: infinite retry with backoff during
    /// startup, in-line logging during steady state; never surfaced.
    #[error("bus unavailable: {0}")]
    Transient(#[source] rdkafka::error::KafkaError),

    /// Inbound message failed to parse against the topic's schema.
    #[error("schema mismatch on topic {topic}: {source}")]
    SchemaMismatch {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    /// A notification's correlation id has no live subscription.
    #[error("no live subscription for correlation id {0}")]
    MissingCorrelation(String),

    /// Outbound payload failed to serialise, or the producer rejected it.
    #[error("failed to enqueue onto {topic}: {source}")]
    Enqueue {
        topic: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// FSM-facing errors (spec §7 item 4).
#[derive(Debug, Error)]
#[error("transition {transition} is not defined for state {state}")]
pub struct InvalidTransition {
    pub state: String,
    pub transition: String,
}

/// Top-level error a binary's `main` can fail with (spec §7 item 7,
/// `FatalStartup`; §6 "Exit codes").
#[derive(Debug, Error)]
pub enum FatalStartup {
    #[error("required environment variable or argument missing: {0}")]
    MissingConfig(String),

    #[error("broker did not become ready within the configured timeout")]
    BrokerTimeout,

    #[error(transparent)]
    Bus(#[from] rdkafka::error::KafkaError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
