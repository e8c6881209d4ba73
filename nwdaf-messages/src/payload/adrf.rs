//! ADRF data-collection and retrieval payloads (spec §4.6, §3 "Dataset record").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::nf::NfEventPayload;
use crate::payload::location::InputData;
use crate::payload::ran::RanEventSubscription;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSetTag {
    pub data_set_id: String,
}

/// A minimal event-exposure subscription request for the NF types the
/// reference system never fully modelled (AMF/SMF/AF/NEF/NRF/NSACF/UPF);
/// GMLC and RAN — the two NFs the throughput pipeline actually drives — get
/// their full typed payload below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericNfSubscription {
    pub event: String,
    pub supis: Vec<String>,
}

/// The inner event-exposure subscription embedded in a dataset-collection
/// request; exactly one variant is populated (spec §4.6 "Dispatch table").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NfDataSubscription {
    Amf(GenericNfSubscription),
    Smf(GenericNfSubscription),
    Af(GenericNfSubscription),
    Nef(GenericNfSubscription),
    Nrf(GenericNfSubscription),
    Nsacf(GenericNfSubscription),
    Upf(GenericNfSubscription),
    Gmlc(InputData),
    Ran(RanEventSubscription),
}

impl NfDataSubscription {
    pub fn nf_type(&self) -> crate::nf::NfType {
        use crate::nf::NfType;
        match self {
            Self::Amf(_) => NfType::Amf,
            Self::Smf(_) => NfType::Smf,
            Self::Af(_) => NfType::Af,
            Self::Nef(_) => NfType::Nef,
            Self::Nrf(_) => NfType::Nrf,
            Self::Nsacf(_) => NfType::Nsacf,
            Self::Upf(_) => NfType::Upf,
            Self::Gmlc(_) => NfType::Gmlc,
            Self::Ran(_) => NfType::Ran,
        }
    }

    /// The topic-name event segment this subscription maps to (spec §4.6:
    /// "map it to the NF/event pair").
    pub fn event_topic_segment(&self) -> String {
        use crate::nf::GmlcEvent;
        match self {
            Self::Gmlc(_) => GmlcEvent::Periodic.to_string(),
            Self::Ran(sub) => sub.event.to_string(),
            Self::Amf(g) | Self::Smf(g) | Self::Af(g) | Self::Nef(g) | Self::Nrf(g)
            | Self::Nsacf(g) | Self::Upf(g) => g.event.clone(),
        }
    }

    /// The inner payload alone, the way it is re-published as a CREATE on
    /// `Control.EventExposureSubscription.<NF>.<event>` (spec §4.6: "re-emit
    /// the embedded inner event-exposure subscription"). Serialization of
    /// these plain-data structs cannot fail in practice; a `Result` is kept
    /// anyway since this crosses into `serde_json`.
    pub fn inner_payload_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::Amf(p) | Self::Smf(p) | Self::Af(p) | Self::Nef(p) | Self::Nrf(p)
            | Self::Nsacf(p) | Self::Upf(p) => serde_json::to_value(p),
            Self::Gmlc(p) => serde_json::to_value(p),
            Self::Ran(p) => serde_json::to_value(p),
        }
    }
}

/// CREATE payload on `Control.DatasetCollectionSubscription`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NadrfDataStoreSubscription {
    pub data_set_tag: DataSetTag,
    pub data_sub: NfDataSubscription,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_time: DateTime<Utc>,
    pub stop_time: DateTime<Utc>,
}

/// CREATE payload on `Control.DatasetRetrievalSubscription`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NadrfDataRetrievalSubscription {
    pub data_set_id: String,
    pub notif_corr_id: String,
    pub notification_uri: String,
    pub time_period: TimeWindow,
}

/// One retrieved record, packaged for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataNotification {
    pub payload: NfEventPayload,
    pub time_stamp: DateTime<Utc>,
}

/// RECEIVE payload on `Data.DatasetRetrievalDelivery` (spec §4.6 "Retrieval").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NadrfDataRetrievalNotification {
    pub notif_corr_id: String,
    pub time_stamp: DateTime<Utc>,
    pub data_notif: DataNotification,
    pub termination_req: bool,
}
