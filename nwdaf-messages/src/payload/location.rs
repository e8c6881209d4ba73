//! GMLC-facing payloads (spec §4.4, §6 `POST /ngmlc-loc/v1/provide-location`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::nf::GmlcEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExternalClientType {
    #[serde(rename = "VALUE_ADDED_SERVICES")]
    ValueAddedServices,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationTypeRequested {
    #[serde(rename = "CURRENT_LOCATION")]
    CurrentLocation,
}

/// Periodic reporting parameters the AnLF always fills identically (spec
/// §12 "GMLC periodic parameters"): amount 1, interval 10s, infinite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodicEventInfo {
    pub reporting_amount: u32,
    pub reporting_interval: u32,
    pub reporting_infinite_ind: bool,
}

/// A GMLC location-reporting subscription (spec §4.4 `InputData`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputData {
    pub supi: String,
    /// Correlation id (spec §4.4 "`sub_id` is used as the `ldr_reference`").
    pub ldr_reference: String,
    pub external_client_type: ExternalClientType,
    pub periodic_event_info: PeriodicEventInfo,
    pub location_type_requested: LocationTypeRequested,
    /// Callback URI used only by the legacy HTTP ingress (spec §13); the
    /// bus-native path ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hgmlc_call_back_uri: Option<String>,
}

/// A GMLC periodic location notification (`EventNotifyDataExt` in the
/// reference system).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventNotifyDataExt {
    pub ldr_reference: String,
    pub event_notify_data_type: GmlcEvent,
    pub supi: String,
    pub timestamp_of_location_estimate: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub h_speed: f64,
    pub bearing: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_data_round_trips() {
        let data = InputData {
            supi: "imsi-001".into(),
            ldr_reference: "S1".into(),
            external_client_type: ExternalClientType::ValueAddedServices,
            periodic_event_info: PeriodicEventInfo {
                reporting_amount: 1,
                reporting_interval: 10,
                reporting_infinite_ind: true,
            },
            location_type_requested: LocationTypeRequested::CurrentLocation,
            hgmlc_call_back_uri: None,
        };
        let json = serde_json::to_string(&data).expect("serialises");
        let back: InputData = serde_json::from_str(&json).expect("deserialises");
        assert_eq!(back.supi, "imsi-001");
        assert_eq!(back.ldr_reference, "S1");
    }
}
