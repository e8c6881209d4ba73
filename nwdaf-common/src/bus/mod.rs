//! Kafka-backed bus: connection config plus typed read/write handlers
//! (spec §4.1 "Bus I/O Layer").

mod config;
mod read;
mod write;

pub use config::{
    CommonBusOpts, create_admin_client, create_default_consumer, create_default_producer,
    generate_kafka_client_config, wait_for_broker,
};
pub use read::{BusReadHandler, CrudCallbacks, ReadMode};
pub use write::{BusWriteHandler, WireMode};
