//! Shared runtime for every NWDAF service binary: bus I/O, service
//! lifecycle, the FSM engine, metrics, tracing and the error taxonomy
//! (spec §4.1–§4.3, §11).

pub mod bus;
pub mod error;
pub mod fsm;
pub mod metrics;
pub mod service;
pub mod tracer;
pub mod version;

pub use bus::{
    BusReadHandler, BusWriteHandler, CommonBusOpts, CrudCallbacks, ReadMode, WireMode,
    create_default_consumer, create_default_producer, generate_kafka_client_config,
    wait_for_broker,
};
pub use error::{BusError, FatalStartup, InvalidTransition};
pub use fsm::{FiniteStateMachine, StateTable, log_invalid_transition};
pub use service::{ServiceBase, ShutdownSignal};
pub use tracer::{TracerEngine, TracerOptions};
pub use version::GIT_VERSION;
