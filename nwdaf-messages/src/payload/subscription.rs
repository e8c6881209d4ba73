//! Analytics subscription and notification payloads (spec §3 "Subscription",
//! §4.4 tick loop `SENDING_ANALYTICS_NOTIF`, §6 HTTP surface).

use serde::{Deserialize, Serialize};

use crate::nf::NwdafEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetUe {
    pub supis: Vec<String>,
}

/// One event inside an analytics subscription request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NnwdafEventSubscription {
    pub event: NwdafEvent,
    pub tgt_ue: TargetUe,
}

/// CREATE payload on `Control.NwdafEventSubscription.<event>` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NnwdafEventsSubscription {
    pub notification_uri: String,
    pub event_subscriptions: Vec<NnwdafEventSubscription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictedThroughputInfo {
    pub supi: String,
    /// Formatted `"X.XX <unit>"`, see spec §9 Open Question (a).
    pub throughput: String,
}

/// One analytic's worth of notification content (spec §4.4
/// `SENDING_ANALYTICS_NOTIF`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventNotification {
    pub event: NwdafEvent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predicted_throughput_infos: Vec<PredictedThroughputInfo>,
}

/// RECEIVE payload on `Data.NwdafEventDelivery.<event>`; also the body the
/// gateway forwards to a subscriber's `notification_uri` over HTTP (spec §6
/// `POST /analytics-notification`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NnwdafEventsSubscriptionNotification {
    pub event_notifications: Vec<EventNotification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_info_formats_with_two_decimals() {
        let info = PredictedThroughputInfo {
            supi: "imsi-001".into(),
            throughput: format!("{:.2} Kbps", 12.3456_f64),
        };
        assert_eq!(info.throughput, "12.35 Kbps");
    }
}
