//! Event-exposure notification shapes for the NFs other than GMLC/RAN (spec
//! §4.6, reproducing the per-NF structure of `AdrfService.py`'s
//! `extract_event_exposure_timestamp`).
//!
//! These NFs sit outside the throughput pipeline's hot path; the ADRF is the
//! only consumer, and only cares about each notification's correlation field
//! and timestamp projection, so each report carries just enough structure to
//! support that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped report, the common element of the list-shaped
/// notification types below.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Report {
    pub time_stamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmfEventNotification {
    pub correlation_id: String,
    pub report_list: Vec<Report>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NsmfEventExposureNotification {
    pub correlation_id: String,
    pub event_notifs: Vec<Report>,
}

/// UDM's monitoring report; unlike the others it is not list-shaped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringReport {
    pub correlation_id: String,
    pub time_stamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NefEventExposureNotif {
    pub correlation_id: String,
    pub event_notifs: Vec<Report>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AfEventExposureNotif {
    pub correlation_id: String,
    pub event_notifs: Vec<Report>,
}

/// NRF notifications carry no timestamp field at all (spec §9(c)); the ADRF
/// always falls back to `now()` for these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NrfNotificationData {
    pub correlation_id: String,
}

/// NSACF slice/service-area-coverage event report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SacEventReport {
    pub correlation_id: String,
    pub report: Report,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpfNotificationData {
    pub correlation_id: String,
    pub notification_items: Vec<Report>,
}
