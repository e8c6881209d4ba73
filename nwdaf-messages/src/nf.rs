//! NF type/event catalog and the closed tagged variant used for dynamic
//! dispatch by NF type (spec §9 Design Notes, "Dynamic dispatch by NF type").
//!
//! The original proof-of-concept dispatches on `isinstance` against a
//! dict-of-dicts keyed by NF type; here each NF gets one `NfEventPayload`
//! variant with the correlation-field name and timestamp-projection baked in
//! as methods, so the ADRF's dispatch table collapses to a `match`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::payload::nf_notifications::{
    AfEventExposureNotif, AmfEventNotification, MonitoringReport, NefEventExposureNotif,
    NrfNotificationData, NsmfEventExposureNotification, SacEventReport, UpfNotificationData,
};
use crate::payload::location::EventNotifyDataExt;
use crate::payload::ran::RanEventExposureNotification;

/// A network function able to produce event-exposure notifications (spec
/// §3 "Event namespace", Glossary "NF").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum NfType {
    #[strum(serialize = "SMF")]
    Smf,
    #[strum(serialize = "AF")]
    Af,
    #[strum(serialize = "AMF")]
    Amf,
    #[strum(serialize = "UPF")]
    Upf,
    #[strum(serialize = "NEF")]
    Nef,
    #[strum(serialize = "GMLC")]
    Gmlc,
    #[strum(serialize = "RAN")]
    Ran,
    #[strum(serialize = "NRF")]
    Nrf,
    #[strum(serialize = "NSACF")]
    Nsacf,
    #[strum(serialize = "UDM")]
    Udm,
}

/// The analytic an AnLF produces (spec §3 "plane" `NwdafEventSubscription` /
/// `NwdafEventDelivery`). The reference system only has one concrete
/// analytic; additional variants are added here, never invented elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum NwdafEvent {
    #[strum(serialize = "UE_LOC_THROUGHPUT")]
    UeLocThroughput,
}

macro_rules! nf_event_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[strum(serialize = $wire)]
                $variant,
            )+
        }
    };
}

nf_event_enum!(SmfEvent {
    PduSessionEstablishment => "PDU_SES_EST",
    PduSessionRelease => "PDU_SES_REL",
});
nf_event_enum!(AfEvent {
    UeCommunication => "UE_COMM",
});
nf_event_enum!(AmfEventType {
    LocationReport => "LOCATION_REPORT",
    Registration => "REGISTRATION_STATE_REPORT",
});
nf_event_enum!(UpfEventType {
    SessionEvent => "SESSION_EVENT",
});
nf_event_enum!(NefEvent {
    PfdReport => "PFD_MANAGEMENT",
});
/// Wire name `EventNotifyDataType` in the reference system; spec calls the
/// GMLC plane's single event `PERIODIC`.
nf_event_enum!(GmlcEvent {
    Periodic => "PERIODIC",
});
nf_event_enum!(RanEvent {
    RsrpInfo => "RSRP_INFO",
});
nf_event_enum!(NrfEvent {
    NfProfileChange => "NF_PROFILE_CHANGE",
});
nf_event_enum!(NsacfEvent {
    NumberOfUes => "NUM_OF_UES_REACH_THRESHOLD",
});
nf_event_enum!(UdmEvent {
    MonitoringReport => "MONITORING_REPORT",
});

/// A received event-exposure notification, tagged by producing NF.
///
/// Each variant knows its own correlation field and timestamp projection,
/// matching `NfInfo.get_correlation_id_field_name` and
/// `extract_event_exposure_timestamp` in the reference `AdrfService.py`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "nf_type")]
pub enum NfEventPayload {
    Amf(AmfEventNotification),
    Smf(NsmfEventExposureNotification),
    Udm(MonitoringReport),
    Nef(NefEventExposureNotif),
    Af(AfEventExposureNotif),
    Nrf(NrfNotificationData),
    Nsacf(SacEventReport),
    Upf(UpfNotificationData),
    Gmlc(EventNotifyDataExt),
    Ran(RanEventExposureNotification),
}

impl NfEventPayload {
    pub fn nf_type(&self) -> NfType {
        match self {
            Self::Amf(_) => NfType::Amf,
            Self::Smf(_) => NfType::Smf,
            Self::Udm(_) => NfType::Udm,
            Self::Nef(_) => NfType::Nef,
            Self::Af(_) => NfType::Af,
            Self::Nrf(_) => NfType::Nrf,
            Self::Nsacf(_) => NfType::Nsacf,
            Self::Upf(_) => NfType::Upf,
            Self::Gmlc(_) => NfType::Gmlc,
            Self::Ran(_) => NfType::Ran,
        }
    }

    /// The value of the field the ADRF compares against its active dataset
    /// id / subscription id set (spec §4.6).
    pub fn correlation_id(&self) -> &str {
        match self {
            Self::Amf(n) => &n.correlation_id,
            Self::Smf(n) => &n.correlation_id,
            Self::Udm(n) => &n.correlation_id,
            Self::Nef(n) => &n.correlation_id,
            Self::Af(n) => &n.correlation_id,
            Self::Nrf(n) => &n.correlation_id,
            Self::Nsacf(n) => &n.correlation_id,
            Self::Upf(n) => &n.correlation_id,
            Self::Gmlc(n) => &n.ldr_reference,
            Self::Ran(n) => &n.correlation_id,
        }
    }

    /// Per spec §3 "timestamps are extracted from the payload by
    /// type-specific projection"; falls back to `now` when the NF's
    /// notification carries none (NRF — spec §9(c)).
    pub fn timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Amf(n) => n.report_list.first().map(|r| r.time_stamp).unwrap_or(now),
            Self::Smf(n) => n
                .event_notifs
                .first()
                .map(|r| r.time_stamp)
                .unwrap_or(now),
            Self::Udm(n) => n.time_stamp,
            Self::Nef(n) => n
                .event_notifs
                .first()
                .map(|r| r.time_stamp)
                .unwrap_or(now),
            Self::Af(n) => n
                .event_notifs
                .first()
                .map(|r| r.time_stamp)
                .unwrap_or(now),
            Self::Nrf(_) => now,
            Self::Nsacf(n) => n.report.time_stamp,
            Self::Upf(n) => n
                .notification_items
                .first()
                .map(|r| r.time_stamp)
                .unwrap_or(now),
            Self::Gmlc(n) => n.timestamp_of_location_estimate,
            // The reference `extract_event_exposure_timestamp` has no case for
            // RAN notifications at all; they fall through to `now()` same as NRF.
            Self::Ran(_) => now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nf_type_renders_spec_topic_segment() {
        assert_eq!(NfType::Gmlc.to_string(), "GMLC");
        assert_eq!(NfType::Ran.to_string(), "RAN");
        assert_eq!(NfType::Amf.to_string(), "AMF");
    }

    #[test]
    fn gmlc_event_renders_periodic() {
        assert_eq!(GmlcEvent::Periodic.to_string(), "PERIODIC");
    }
}
