//! The throughput pipeline's tick loop (spec §4.4 "Tick loop").

use nwdaf_common::{BusWriteHandler, WireMode, log_invalid_transition};
use nwdaf_messages::payload::location::{
    ExternalClientType, InputData, LocationTypeRequested, PeriodicEventInfo,
};
use nwdaf_messages::payload::ran::RanEventSubscription;
use nwdaf_messages::payload::subscription::{
    EventNotification, NnwdafEventsSubscriptionNotification, PredictedThroughputInfo,
};
use nwdaf_messages::nf::RanEvent;
use nwdaf_messages::{NwdafEvent, OperationType};
use tracing::{error, warn};

use crate::predictor::{Predictor, ThroughputFeatures};
use crate::registry::SubscriptionRegistry;
use crate::state_machine::{ThroughputState, ThroughputTransition};

/// Unit the reference implementation actually formats with (spec §12
/// "throughput unit"); exposed as a constant rather than hardcoded inline
/// per the spec's note that it should be easy to retarget.
pub const THROUGHPUT_UNIT: &str = "Kbps";

/// GMLC reporting cadence fixed by the reference system (spec §12 "GMLC
/// periodic parameters").
const GMLC_REPORTING_INTERVAL_SECONDS: u32 = 10;
const RAN_REPORTING_PERIODICITY_SECONDS: u32 = 10;

pub struct TickWriters<'a> {
    pub gmlc_subscription: &'a BusWriteHandler<InputData>,
    pub ran_subscription: &'a BusWriteHandler<RanEventSubscription>,
    pub analytics_notification: &'a BusWriteHandler<NnwdafEventsSubscriptionNotification>,
}

/// Drives every `(sub_id, SUPI)` FSM one step, performing whatever bus I/O
/// or inference call that state calls for (spec §4.4 "Tick loop" table).
pub async fn tick<P: Predictor>(
    registry: &mut SubscriptionRegistry,
    predictor: &P,
    writers: &TickWriters<'_>,
) {
    registry.sweep_deleted();

    for (sub_id, supi) in registry.ordered_keys() {
        let Some(entry) = registry.get_mut(sub_id.as_ref(), supi.as_ref()) else {
            continue;
        };

        match entry.fsm.state() {
            ThroughputState::Initializing => {
                let gmlc_request = InputData {
                    supi: supi.to_string(),
                    ldr_reference: sub_id.to_string(),
                    external_client_type: ExternalClientType::ValueAddedServices,
                    periodic_event_info: PeriodicEventInfo {
                        reporting_amount: 1,
                        reporting_interval: GMLC_REPORTING_INTERVAL_SECONDS,
                        reporting_infinite_ind: true,
                    },
                    location_type_requested: LocationTypeRequested::CurrentLocation,
                    hgmlc_call_back_uri: None,
                };
                if let Err(e) = writers
                    .gmlc_subscription
                    .enqueue(&sub_id, &gmlc_request, OperationType::Create)
                    .await
                {
                    warn!(%sub_id, %supi, error = %e, "failed to open GMLC subscription");
                }

                let ran_request = RanEventSubscription {
                    event: RanEvent::RsrpInfo,
                    correlation_id: sub_id.to_string(),
                    notif_uri: String::new(),
                    ue_ids: vec![supi.to_string()],
                    periodicity: RAN_REPORTING_PERIODICITY_SECONDS,
                };
                if let Err(e) = writers
                    .ran_subscription
                    .enqueue(&sub_id, &ran_request, OperationType::Create)
                    .await
                {
                    warn!(%sub_id, %supi, error = %e, "failed to open RAN subscription");
                }

                log_invalid_transition(entry.fsm.transition(ThroughputTransition::InitializationDone));
            }

            ThroughputState::WaitingForGmlcNotif | ThroughputState::WaitingForRanNotif => {
                let transition = if entry.pending_gmlc.is_some() && entry.pending_ran.is_some() {
                    ThroughputTransition::AllNotifsReceived
                } else {
                    ThroughputTransition::WaitingForNotifs
                };
                log_invalid_transition(entry.fsm.transition(transition));
            }

            ThroughputState::PredictingThroughput => {
                let (Some(gmlc), Some(ran)) = (entry.pending_gmlc, entry.pending_ran) else {
                    // Shouldn't happen given the invariant in spec §3, but a
                    // stray DELETE racing a notification can clear one slot
                    // between ticks; fall back to waiting rather than panic.
                    log_invalid_transition(entry.fsm.transition(ThroughputTransition::WaitingForNotifs));
                    continue;
                };

                let features = ThroughputFeatures {
                    latitude: gmlc.latitude,
                    longitude: gmlc.longitude,
                    lte_rsrp: ran.lte_rsrp,
                    nr_ss_rsrp: ran.nr_ss_rsrp,
                    h_speed: gmlc.h_speed,
                    bearing: gmlc.bearing,
                };

                match predictor.predict(features).await {
                    Ok(value) => {
                        entry.pending_prediction = Some(value.abs());
                        entry.pending_gmlc = None;
                        entry.pending_ran = None;
                        log_invalid_transition(entry.fsm.transition(ThroughputTransition::PredictionDone));
                    }
                    Err(e) => {
                        // InferenceUnavailable: stay in PREDICTING_THROUGHPUT
                        // and retry next tick (spec §7).
                        warn!(%sub_id, %supi, error = %e, "inference unavailable, retrying next tick");
                    }
                }
            }

            ThroughputState::SendingAnalyticsNotif => {
                let Some(throughput) = entry.pending_prediction.take() else {
                    error!(%sub_id, %supi, "entered SENDING_ANALYTICS_NOTIF with no prediction");
                    log_invalid_transition(entry.fsm.transition(ThroughputTransition::AnalyticsNotifSent));
                    continue;
                };

                let notification = NnwdafEventsSubscriptionNotification {
                    event_notifications: vec![EventNotification {
                        event: NwdafEvent::UeLocThroughput,
                        predicted_throughput_infos: vec![PredictedThroughputInfo {
                            supi: supi.to_string(),
                            throughput: format!("{throughput:.2} {THROUGHPUT_UNIT}"),
                        }],
                    }],
                };

                if let Err(e) = writers
                    .analytics_notification
                    .enqueue(&sub_id, &notification, OperationType::Receive)
                    .await
                {
                    warn!(%sub_id, %supi, error = %e, "failed to publish analytics notification");
                }

                log_invalid_transition(entry.fsm.transition(ThroughputTransition::AnalyticsNotifSent));
            }

            ThroughputState::Deleting => {}
        }
    }
}

/// `WireMode` every tick-loop writer uses, named here so `main.rs` builds
/// handlers consistently (subscriptions are CRUD, the analytics delivery is
/// plain RECEIVE payload).
pub const SUBSCRIPTION_WIRE_MODE: WireMode = WireMode::Crud;
pub const DELIVERY_WIRE_MODE: WireMode = WireMode::Payload;
