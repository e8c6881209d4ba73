//! Per-`(sub_id, SUPI)` throughput pipeline state (spec §3 "Per-SUPI
//! subscription state").

use std::collections::HashMap;
use std::sync::Arc;

use nwdaf_common::{FiniteStateMachine, log_invalid_transition};

use crate::state_machine::{ThroughputState, ThroughputTransition, throughput_state_table};

/// `(lat, lon, speed, bearing)` extracted from a GMLC periodic notification.
#[derive(Debug, Clone, Copy)]
pub struct GmlcSample {
    pub latitude: f64,
    pub longitude: f64,
    pub h_speed: f64,
    pub bearing: u32,
}

/// `(lte_rsrp, nr_ss_rsrp)` extracted from a RAN RSRP notification.
#[derive(Debug, Clone, Copy)]
pub struct RanSample {
    pub lte_rsrp: f64,
    pub nr_ss_rsrp: f64,
}

/// One `(sub_id, SUPI)`'s pending data and FSM instance (spec §3 invariant:
/// "after any FSM tick, either at most one pending-data slot is non-bottom
/// and the FSM is in a waiting state, or both are non-bottom and the FSM is
/// at or past PREDICTING").
pub struct ThroughputSubscriptionData {
    pub sub_id: Arc<str>,
    pub supi: Arc<str>,
    pub pending_gmlc: Option<GmlcSample>,
    pub pending_ran: Option<RanSample>,
    pub pending_prediction: Option<f64>,
    pub fsm: FiniteStateMachine<'static, ThroughputState, ThroughputTransition>,
}

impl ThroughputSubscriptionData {
    fn new(sub_id: Arc<str>, supi: Arc<str>) -> Self {
        Self {
            sub_id,
            supi,
            pending_gmlc: None,
            pending_ran: None,
            pending_prediction: None,
            fsm: FiniteStateMachine::new(throughput_state_table(), ThroughputState::Initializing),
        }
    }

    pub fn key(&self) -> (Arc<str>, Arc<str>) {
        (self.sub_id.clone(), self.supi.clone())
    }
}

/// The composite-key map every AnLF instance owns (spec §5 "the in-memory
/// subscription registry is owned by a single service instance").
/// Insertion order is preserved for the tick loop's deterministic sweep
/// (spec §5 "the FSM tick loop visits subscriptions in insertion order").
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: HashMap<(Arc<str>, Arc<str>), ThroughputSubscriptionData>,
    order: Vec<(Arc<str>, Arc<str>)>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens per-SUPI state for every target UE in a new subscription
    /// (spec §3: "created when an analytics subscription targets that SUPI").
    pub fn open(&mut self, sub_id: &str, supis: &[String]) {
        let sub_id: Arc<str> = Arc::from(sub_id);
        for supi in supis {
            let supi: Arc<str> = Arc::from(supi.as_str());
            let key = (sub_id.clone(), supi.clone());
            if !self.entries.contains_key(&key) {
                self.order.push(key.clone());
                self.entries
                    .insert(key, ThroughputSubscriptionData::new(sub_id.clone(), supi));
            }
        }
    }

    /// Marks every entry under `sub_id` for deletion; actual removal
    /// happens once the FSM reaches `Deleting` (spec §3 "destroyed when the
    /// FSM reaches DELETING").
    pub fn request_deletion(&mut self, sub_id: &str) {
        for (key, entry) in &mut self.entries {
            if key.0.as_ref() == sub_id {
                log_invalid_transition(entry.fsm.transition(ThroughputTransition::DeletionRequested));
            }
        }
    }

    /// Returns `true` only if `sub_id` currently owns at least one live
    /// `(sub_id, SUPI)` entry (spec §4.4 "Correlation": "ignored unless
    /// their correlation matches a currently held subscription").
    pub fn is_live(&self, sub_id: &str) -> bool {
        self.order
            .iter()
            .any(|(held_sub, _)| held_sub.as_ref() == sub_id)
    }

    pub fn get_mut(&mut self, sub_id: &str, supi: &str) -> Option<&mut ThroughputSubscriptionData> {
        self.entries
            .iter_mut()
            .find(|((s, u), _)| s.as_ref() == sub_id && u.as_ref() == supi)
            .map(|(_, v)| v)
    }

    /// Every live key in insertion order (spec §5 "the FSM tick loop visits
    /// subscriptions in insertion order").
    pub fn ordered_keys(&self) -> Vec<(Arc<str>, Arc<str>)> {
        self.order.clone()
    }

    /// Drops every entry whose FSM has reached `Deleting` (spec §4.4
    /// "DELETING: remove the per-SUPI entry; no further ticks").
    pub fn sweep_deleted(&mut self) {
        let deleted: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.fsm.state() == ThroughputState::Deleting)
            .map(|(key, _)| key.clone())
            .collect();

        for key in deleted {
            self.entries.remove(&key);
            self.order.retain(|k| k != &key);
        }
    }
}
