//! Topic-name registry (spec §3 "Event namespace", §4.7 "Topic Bootstrap").
//!
//! Every function here returns the literal topic-name string; these strings
//! are part of the wire contract (spec §6: "any implementation must preserve
//! these strings bit-for-bit") and must never be derived any other way than
//! through this module.

use strum::IntoEnumIterator;

use crate::nf::{
    AfEvent, AmfEventType, GmlcEvent, NefEvent, NfType, NrfEvent, NsacfEvent, NwdafEvent, RanEvent,
    SmfEvent, UdmEvent, UpfEventType,
};

/// One of the eight topic "planes" named in spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    NwdafEventSubscription,
    NwdafEventDelivery,
    EventExposureSubscription,
    EventExposureDelivery,
    MlModelProvisionSubscription,
    MlModelProvisionDelivery,
    DatasetCollectionSubscription,
    DatasetRetrievalSubscription,
    DatasetRetrievalDelivery,
}

impl Plane {
    fn segment(self) -> &'static str {
        match self {
            Self::NwdafEventSubscription => "Control.NwdafEventSubscription",
            Self::NwdafEventDelivery => "Data.NwdafEventDelivery",
            Self::EventExposureSubscription => "Control.EventExposureSubscription",
            Self::EventExposureDelivery => "Data.EventExposureDelivery",
            Self::MlModelProvisionSubscription => "Control.MLModelProvisionSubscription",
            Self::MlModelProvisionDelivery => "Data.MLModelProvisionDelivery",
            Self::DatasetCollectionSubscription => "Control.DatasetCollectionSubscription",
            Self::DatasetRetrievalSubscription => "Control.DatasetRetrievalSubscription",
            Self::DatasetRetrievalDelivery => "Data.DatasetRetrievalDelivery",
        }
    }
}

/// `Control.NwdafEventSubscription.<event>` (spec §3, §4.4).
pub fn nwdaf_event_subscription(event: NwdafEvent) -> String {
    format!("{}.{event}", Plane::NwdafEventSubscription.segment())
}

/// `Data.NwdafEventDelivery.<event>` (spec §4.4 `SENDING_ANALYTICS_NOTIF`).
pub fn nwdaf_event_delivery(event: NwdafEvent) -> String {
    format!("{}.{event}", Plane::NwdafEventDelivery.segment())
}

/// `Control.EventExposureSubscription.<NF>.<event>` (spec §4.4, §4.6).
pub fn event_exposure_subscription(nf: NfType, event: impl std::fmt::Display) -> String {
    format!("{}.{nf}.{event}", Plane::EventExposureSubscription.segment())
}

/// `Data.EventExposureDelivery.<NF>.<event>` (spec §4.6).
pub fn event_exposure_delivery(nf: NfType, event: impl std::fmt::Display) -> String {
    format!("{}.{nf}.{event}", Plane::EventExposureDelivery.segment())
}

/// `Control.MLModelProvisionSubscription.<event>` (spec §4.4, §4.5).
pub fn ml_model_provision_subscription(event: NwdafEvent) -> String {
    format!(
        "{}.{event}",
        Plane::MlModelProvisionSubscription.segment()
    )
}

/// `Data.MLModelProvisionDelivery.<event>` (spec §4.5).
pub fn ml_model_provision_delivery(event: NwdafEvent) -> String {
    format!("{}.{event}", Plane::MlModelProvisionDelivery.segment())
}

/// `Control.DatasetCollectionSubscription` (spec §4.6, no NF/event suffix).
pub fn dataset_collection_subscription() -> &'static str {
    Plane::DatasetCollectionSubscription.segment()
}

/// `Control.DatasetRetrievalSubscription` (spec §4.6).
pub fn dataset_retrieval_subscription() -> &'static str {
    Plane::DatasetRetrievalSubscription.segment()
}

/// `Data.DatasetRetrievalDelivery` (spec §4.6).
pub fn dataset_retrieval_delivery() -> &'static str {
    Plane::DatasetRetrievalDelivery.segment()
}

fn event_exposure_topics_for(prefix: Plane, nf: NfType, events: Vec<String>) -> Vec<String> {
    events
        .into_iter()
        .map(|event| format!("{}.{nf}.{event}", prefix.segment()))
        .collect()
}

/// Derives the complete topic namespace from the NF×event catalog plus the
/// fixed control/delivery plane topics (spec §4.7).
pub struct TopicCatalog;

impl TopicCatalog {
    /// Every topic this system ever produces to or consumes from, in the
    /// order the bootstrap initialiser should create them.
    pub fn all() -> Vec<String> {
        let mut topics = Vec::new();

        for event in NwdafEvent::iter() {
            topics.push(nwdaf_event_subscription(event));
            topics.push(nwdaf_event_delivery(event));
            topics.push(ml_model_provision_subscription(event));
            topics.push(ml_model_provision_delivery(event));
        }

        for prefix in [
            Plane::EventExposureSubscription,
            Plane::EventExposureDelivery,
        ] {
            topics.extend(event_exposure_topics_for(
                prefix,
                NfType::Smf,
                SmfEvent::iter().map(|e| e.to_string()).collect(),
            ));
            topics.extend(event_exposure_topics_for(
                prefix,
                NfType::Af,
                AfEvent::iter().map(|e| e.to_string()).collect(),
            ));
            topics.extend(event_exposure_topics_for(
                prefix,
                NfType::Amf,
                AmfEventType::iter().map(|e| e.to_string()).collect(),
            ));
            topics.extend(event_exposure_topics_for(
                prefix,
                NfType::Upf,
                UpfEventType::iter().map(|e| e.to_string()).collect(),
            ));
            topics.extend(event_exposure_topics_for(
                prefix,
                NfType::Nef,
                NefEvent::iter().map(|e| e.to_string()).collect(),
            ));
            topics.extend(event_exposure_topics_for(
                prefix,
                NfType::Gmlc,
                GmlcEvent::iter().map(|e| e.to_string()).collect(),
            ));
            topics.extend(event_exposure_topics_for(
                prefix,
                NfType::Ran,
                RanEvent::iter().map(|e| e.to_string()).collect(),
            ));
            topics.extend(event_exposure_topics_for(
                prefix,
                NfType::Nrf,
                NrfEvent::iter().map(|e| e.to_string()).collect(),
            ));
            topics.extend(event_exposure_topics_for(
                prefix,
                NfType::Nsacf,
                NsacfEvent::iter().map(|e| e.to_string()).collect(),
            ));
            topics.extend(event_exposure_topics_for(
                prefix,
                NfType::Udm,
                UdmEvent::iter().map(|e| e.to_string()).collect(),
            ));
        }

        topics.push(dataset_collection_subscription().to_owned());
        topics.push(dataset_retrieval_subscription().to_owned());
        topics.push(dataset_retrieval_delivery().to_owned());

        topics
    }
}

/// The JSON field name the ADRF reads off each NF's event-exposure
/// notification to compare against its active dataset/subscription id set
/// (spec §4.6; `NfInfo.get_correlation_id_field_name` in the reference
/// system). `NfEventPayload::correlation_id` is the authoritative extractor;
/// this is for logs and diagnostics only.
pub fn correlation_field_name(nf: NfType) -> &'static str {
    match nf {
        NfType::Gmlc => "ldr_reference",
        _ => "correlation_id",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names_are_dot_joined_as_specified() {
        assert_eq!(
            nwdaf_event_subscription(NwdafEvent::UeLocThroughput),
            "Control.NwdafEventSubscription.UE_LOC_THROUGHPUT"
        );
        assert_eq!(
            nwdaf_event_delivery(NwdafEvent::UeLocThroughput),
            "Data.NwdafEventDelivery.UE_LOC_THROUGHPUT"
        );
        assert_eq!(
            event_exposure_subscription(NfType::Gmlc, GmlcEvent::Periodic),
            "Control.EventExposureSubscription.GMLC.PERIODIC"
        );
        assert_eq!(
            event_exposure_subscription(NfType::Ran, RanEvent::RsrpInfo),
            "Control.EventExposureSubscription.RAN.RSRP_INFO"
        );
        assert_eq!(
            dataset_collection_subscription(),
            "Control.DatasetCollectionSubscription"
        );
    }

    #[test]
    fn catalog_is_idempotent_in_content() {
        let first = TopicCatalog::all();
        let second = TopicCatalog::all();
        assert_eq!(first, second);
        assert!(first.contains(&"Control.EventExposureSubscription.GMLC.PERIODIC".to_owned()));
        assert!(first.contains(&"Data.EventExposureDelivery.RAN.RSRP_INFO".to_owned()));
        assert!(first.contains(&"Control.DatasetRetrievalSubscription".to_owned()));
    }
}
