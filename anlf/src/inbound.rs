//! Single inbound sequencer (spec §9 Design Notes "Single inbound
//! sequencer"): every read handler's callback tags and forwards its event
//! onto one channel, so the handling loop processes them in arrival order
//! without per-topic task interleaving races.

use nwdaf_messages::{MlModelAddr, RanEventExposureNotification};
use tracing::debug;

use crate::predictor::HttpPredictor;
use crate::registry::{GmlcSample, RanSample, SubscriptionRegistry};

/// The subset of GMLC's notification the AnLF actually needs.
#[derive(Debug, Clone)]
pub struct GmlcNotification {
    pub sub_id: String,
    pub supi: String,
    pub sample: GmlcSample,
}

#[derive(Debug, Clone)]
pub enum AnlfInboundEvent {
    /// CREATE on `Control.NwdafEventSubscription.UE_LOC_THROUGHPUT`.
    SubscriptionCreated { sub_id: String, supis: Vec<String> },
    /// DELETE on the same topic.
    SubscriptionDeleted { sub_id: String },
    /// RECEIVE on `Data.MLModelProvisionDelivery.UE_LOC_THROUGHPUT`.
    ModelProvisioned(MlModelAddr),
    /// RECEIVE on `Data.EventExposureDelivery.GMLC.PERIODIC`.
    GmlcNotif(GmlcNotification),
    /// RECEIVE on `Data.EventExposureDelivery.RAN.RSRP_INFO`.
    RanNotif(RanEventExposureNotification),
}

/// Folds one inbound event into the registry (and, for a model delivery,
/// the predictor). This is the only place mutation happens, which is what
/// lets the rest of the service run lock-free (spec §5).
pub async fn apply(
    registry: &mut SubscriptionRegistry,
    predictor: &HttpPredictor,
    event: AnlfInboundEvent,
) {
    match event {
        AnlfInboundEvent::SubscriptionCreated { sub_id, supis } => {
            registry.open(&sub_id, &supis);
        }
        AnlfInboundEvent::SubscriptionDeleted { sub_id } => {
            registry.request_deletion(&sub_id);
        }
        AnlfInboundEvent::ModelProvisioned(addr) => {
            predictor.set_model_addr(addr).await;
        }
        AnlfInboundEvent::GmlcNotif(notif) => {
            if registry.is_live(&notif.sub_id) {
                if let Some(entry) = registry.get_mut(&notif.sub_id, &notif.supi) {
                    entry.pending_gmlc = Some(notif.sample);
                }
            } else {
                debug!(sub_id = %notif.sub_id, "dropping GMLC notification for unknown subscription");
            }
        }
        AnlfInboundEvent::RanNotif(notif) => {
            if registry.is_live(&notif.correlation_id) {
                for info in &notif.rsrp_infos {
                    if let Some(entry) = registry.get_mut(&notif.correlation_id, &info.ue_id) {
                        entry.pending_ran = Some(RanSample {
                            lte_rsrp: info.lte_rsrp,
                            nr_ss_rsrp: info.nr_ss_rsrp,
                        });
                    }
                }
            } else {
                debug!(sub_id = %notif.correlation_id, "dropping RAN notification for unknown subscription");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscription_created_opens_entries_for_every_supi() {
        let mut registry = SubscriptionRegistry::new();
        let predictor = HttpPredictor::new();
        apply(
            &mut registry,
            &predictor,
            AnlfInboundEvent::SubscriptionCreated {
                sub_id: "sub-1".into(),
                supis: vec!["imsi-1".into(), "imsi-2".into()],
            },
        )
        .await;
        assert!(registry.get_mut("sub-1", "imsi-1").is_some());
        assert!(registry.get_mut("sub-1", "imsi-2").is_some());
    }

    #[tokio::test]
    async fn notification_for_unknown_subscription_is_dropped() {
        let mut registry = SubscriptionRegistry::new();
        let predictor = HttpPredictor::new();
        apply(
            &mut registry,
            &predictor,
            AnlfInboundEvent::GmlcNotif(GmlcNotification {
                sub_id: "ghost".into(),
                supi: "imsi-1".into(),
                sample: GmlcSample {
                    latitude: 0.0,
                    longitude: 0.0,
                    h_speed: 0.0,
                    bearing: 0,
                },
            }),
        )
        .await;
        assert!(registry.get_mut("ghost", "imsi-1").is_none());
    }
}
