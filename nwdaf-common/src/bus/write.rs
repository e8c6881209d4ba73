//! Outbound half of the bus I/O layer (spec §4.1 "Write handler").

use std::marker::PhantomData;
use std::time::Duration;

use nwdaf_messages::{Envelope, OperationType};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use serde::Serialize;

use crate::error::BusError;

const PRODUCER_TIMEOUT: Timeout = Timeout::After(Duration::from_millis(5_000));

/// Whether a topic carries `{op_type, resource_id, resource_data}` envelopes
/// or the bare payload (spec §4.1: "In PAYLOAD mode the serialised form is
/// the payload alone; in CRUD mode it is the full envelope").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireMode {
    Payload,
    Crud,
}

/// A typed producer bound to one topic. FIFO-per-key and at-least-once
/// follow directly from using the key as the Kafka partition key and from
/// never suppressing a send retry (spec §4.1 guarantees).
pub struct BusWriteHandler<T> {
    topic: String,
    mode: WireMode,
    producer: FutureProducer,
    _payload: PhantomData<fn() -> T>,
}

impl<T> BusWriteHandler<T>
where
    T: Serialize,
{
    pub fn new(producer: FutureProducer, topic: impl Into<String>, mode: WireMode) -> Self {
        Self {
            topic: topic.into(),
            mode,
            producer,
            _payload: PhantomData,
        }
    }

    /// Serialises and enqueues `payload` keyed by `key`. In `Crud` mode
    /// `op_type` is wrapped around the payload; in `Payload` mode it is
    /// ignored (RECEIVE is implicit).
    pub async fn enqueue(
        &self,
        key: &str,
        payload: &T,
        op_type: OperationType,
    ) -> Result<(), BusError> {
        let body = match self.mode {
            WireMode::Payload => serde_json::to_vec(payload),
            WireMode::Crud => serde_json::to_vec(&Envelope::new(op_type, key, payload)),
        }
        .map_err(|e| BusError::Enqueue {
            topic: self.topic.clone(),
            source: Box::new(e),
        })?;

        let record = FutureRecord::to(&self.topic).key(key).payload(&body);

        self.producer
            .send(record, PRODUCER_TIMEOUT)
            .await
            .map_err(|(e, _)| BusError::Enqueue {
                topic: self.topic.clone(),
                source: Box::new(e),
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_modes_are_distinct() {
        assert_ne!(WireMode::Payload, WireMode::Crud);
    }
}
