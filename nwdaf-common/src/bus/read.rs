//! Inbound half of the bus I/O layer (spec §4.1 "Read handler").

use nwdaf_messages::{Envelope, OperationType};
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::metrics::{self, FailureKind};
use crate::service::ShutdownSignal;

/// Per-operation-type callbacks for a `CRUD`-mode topic (spec §4.1:
/// "separate callbacks per operation type, fn(resource_id, parsed_payload)").
#[derive(Default)]
pub struct CrudCallbacks<T> {
    pub on_create: Option<Box<dyn Fn(String, T) + Send + Sync>>,
    pub on_update: Option<Box<dyn Fn(String, T) + Send + Sync>>,
    pub on_delete: Option<Box<dyn Fn(String, T) + Send + Sync>>,
    pub on_read: Option<Box<dyn Fn(String, T) + Send + Sync>>,
}

impl<T> CrudCallbacks<T> {
    pub fn new() -> Self {
        Self {
            on_create: None,
            on_update: None,
            on_delete: None,
            on_read: None,
        }
    }

    pub fn on_create(mut self, f: impl Fn(String, T) + Send + Sync + 'static) -> Self {
        self.on_create = Some(Box::new(f));
        self
    }

    pub fn on_update(mut self, f: impl Fn(String, T) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn on_delete(mut self, f: impl Fn(String, T) + Send + Sync + 'static) -> Self {
        self.on_delete = Some(Box::new(f));
        self
    }

    pub fn on_read(mut self, f: impl Fn(String, T) + Send + Sync + 'static) -> Self {
        self.on_read = Some(Box::new(f));
        self
    }

    fn dispatch(&self, op_type: OperationType, resource_id: String, payload: T) {
        let handler = match op_type {
            OperationType::Create => &self.on_create,
            OperationType::Update => &self.on_update,
            OperationType::Delete => &self.on_delete,
            OperationType::Read => &self.on_read,
            OperationType::Receive => {
                debug!("RECEIVE op_type on a CRUD-mode topic; ignoring");
                return;
            }
        };
        match handler {
            Some(f) => f(resource_id, payload),
            None => debug!(?op_type, "no callback registered for this operation type"),
        }
    }
}

/// Mode a read handler consumes a topic in (spec §4.1). `Receive` is handed
/// the Kafka message key alongside the payload: spec §3 defines the
/// resource-id as "used both as Kafka message key and as correlation-id",
/// and RECEIVE-mode topics carry no resource-id inside the payload itself
/// (the gateway needs it to map a delivery back to a `notification_uri`).
pub enum ReadMode<T> {
    Crud(CrudCallbacks<T>),
    Receive(Box<dyn Fn(String, T) + Send + Sync>),
}

/// A typed consumer bound to one topic, dispatching to registered callbacks.
pub struct BusReadHandler<T> {
    topic: String,
    consumer: StreamConsumer,
    mode: ReadMode<T>,
}

impl<T> BusReadHandler<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub fn new(consumer: StreamConsumer, topic: impl Into<String>, mode: ReadMode<T>) -> Self {
        Self {
            topic: topic.into(),
            consumer,
            mode,
        }
    }

    fn message_kind(&self) -> metrics::MessageKind {
        if self.topic.starts_with("Data.") {
            metrics::MessageKind::Data
        } else {
            metrics::MessageKind::Control
        }
    }

    fn handle_payload(&self, key: &str, raw: &[u8]) {
        let kind = self.message_kind();
        metrics::messages_received::incr(kind);
        match &self.mode {
            ReadMode::Crud(callbacks) => match serde_json::from_slice::<Envelope<T>>(raw) {
                Ok(envelope) => {
                    callbacks.dispatch(envelope.op_type, envelope.resource_id, envelope.resource_data);
                    metrics::messages_processed::incr(kind);
                }
                Err(e) => {
                    warn!(topic = %self.topic, error = %e, "schema mismatch, dropping message");
                    metrics::failures::incr(FailureKind::SchemaMismatch);
                }
            },
            ReadMode::Receive(callback) => match serde_json::from_slice::<T>(raw) {
                Ok(payload) => {
                    callback(key.to_owned(), payload);
                    metrics::messages_processed::incr(kind);
                }
                Err(e) => {
                    warn!(topic = %self.topic, error = %e, "schema mismatch, dropping message");
                    metrics::failures::incr(FailureKind::SchemaMismatch);
                }
            },
        }
    }

    /// Consumes until `shutdown` fires. Malformed messages are logged and
    /// skipped with the offset still advanced (spec §4.1 "Read handler").
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                message = self.consumer.recv() => {
                    match message {
                        Ok(msg) => {
                            if let Some(payload) = msg.payload() {
                                let key = msg
                                    .key()
                                    .and_then(|k| std::str::from_utf8(k).ok())
                                    .unwrap_or_default();
                                self.handle_payload(key, payload);
                            }
                            if let Err(e) = self.consumer.commit_message(&msg, CommitMode::Async) {
                                warn!(topic = %self.topic, error = %e, "failed to commit offset");
                            }
                        }
                        Err(e) => warn!(topic = %self.topic, error = %e, "bus read error"),
                    }
                }
            }
        }
    }
}
