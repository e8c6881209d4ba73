//! Wire schema shared by every NWDAF service instance.
//!
//! This crate owns the three things that must agree bit-for-bit across
//! process boundaries: the topic namespace (`catalog`), the envelope framing
//! used on every topic (`envelope`), and the JSON payload shapes carried
//! inside that framing (`nf`, `payload`).

pub mod catalog;
pub mod envelope;
pub mod nf;
pub mod payload;

pub use catalog::{Plane, TopicCatalog};
pub use envelope::{Envelope, OperationType};
pub use nf::{NfEventPayload, NfType, NwdafEvent};
