//! JSON payload shapes carried inside bus envelopes (spec §3, §4.4–§4.6).

pub mod adrf;
pub mod location;
pub mod ml;
pub mod nf_notifications;
pub mod ran;
pub mod subscription;

pub use adrf::{
    DataNotification, DataSetTag, GenericNfSubscription, NadrfDataRetrievalNotification,
    NadrfDataRetrievalSubscription, NadrfDataStoreSubscription, NfDataSubscription, TimeWindow,
};
pub use location::{ExternalClientType, InputData, LocationTypeRequested, PeriodicEventInfo};
pub use ml::{MlEventNotif, MlEventSubscription, MlModelAddr};
pub use ran::{RanEventSubscription, RsrpInfo};
pub use subscription::{
    EventNotification, NnwdafEventSubscription, NnwdafEventsSubscription,
    NnwdafEventsSubscriptionNotification, PredictedThroughputInfo, TargetUe,
};
