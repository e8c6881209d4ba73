//! RAN-facing payloads (spec §4.4, §6 `POST /ran-event-exposure/v1/subscriptions`).

use serde::{Deserialize, Serialize};

use crate::nf::RanEvent;

/// A RAN RSRP subscription (spec §4.4 `RanEventSubscription`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RanEventSubscription {
    pub event: RanEvent,
    pub correlation_id: String,
    /// Placeholder per spec §12: the bus-native redesign delivers RAN
    /// notifications over `Data.EventExposureDelivery.RAN.<event>`, not to
    /// this URI; it is retained because the RAN stub's legacy HTTP ingress
    /// still accepts and echoes it.
    pub notif_uri: String,
    pub ue_ids: Vec<String>,
    pub periodicity: u32,
}

/// One UE's RSRP reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsrpInfo {
    pub ue_id: String,
    pub lte_rsrp: f64,
    pub nr_ss_rsrp: f64,
}

/// A RAN RSRP notification, possibly batching several UEs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RanEventExposureNotification {
    pub correlation_id: String,
    pub rsrp_infos: Vec<RsrpInfo>,
}
