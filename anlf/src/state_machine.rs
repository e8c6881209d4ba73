//! The throughput pipeline's per-SUPI state table (spec §4.4 "States &
//! transitions").

use nwdaf_common::StateTable;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThroughputState {
    Initializing,
    WaitingForGmlcNotif,
    WaitingForRanNotif,
    PredictingThroughput,
    SendingAnalyticsNotif,
    Deleting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThroughputTransition {
    InitializationDone,
    AllNotifsReceived,
    WaitingForNotifs,
    PredictionDone,
    AnalyticsNotifSent,
    DeletionRequested,
}

static TABLE: OnceLock<StateTable<ThroughputState, ThroughputTransition>> = OnceLock::new();

/// The table is identical for every instance; built once and shared by
/// reference across every live `(sub_id, SUPI)` FSM.
pub fn throughput_state_table() -> &'static StateTable<ThroughputState, ThroughputTransition> {
    TABLE.get_or_init(|| {
        use ThroughputState::*;
        use ThroughputTransition::*;

        StateTable::new()
            .edge(Initializing, InitializationDone, WaitingForGmlcNotif)
            .edge(WaitingForGmlcNotif, AllNotifsReceived, PredictingThroughput)
            .edge(WaitingForGmlcNotif, WaitingForNotifs, WaitingForRanNotif)
            .edge(WaitingForRanNotif, AllNotifsReceived, PredictingThroughput)
            .edge(WaitingForRanNotif, WaitingForNotifs, WaitingForGmlcNotif)
            .edge(
                PredictingThroughput,
                PredictionDone,
                SendingAnalyticsNotif,
            )
            .edge(
                SendingAnalyticsNotif,
                AnalyticsNotifSent,
                WaitingForGmlcNotif,
            )
            .wildcard_edge(DeletionRequested, Deleting)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nwdaf_common::FiniteStateMachine;

    #[test]
    fn full_happy_path_cycles_back_to_waiting_for_gmlc() {
        let table = throughput_state_table();
        let mut fsm = FiniteStateMachine::new(table, ThroughputState::Initializing);

        assert_eq!(
            fsm.transition(ThroughputTransition::InitializationDone)
                .unwrap(),
            ThroughputState::WaitingForGmlcNotif
        );
        assert_eq!(
            fsm.transition(ThroughputTransition::AllNotifsReceived)
                .unwrap(),
            ThroughputState::PredictingThroughput
        );
        assert_eq!(
            fsm.transition(ThroughputTransition::PredictionDone).unwrap(),
            ThroughputState::SendingAnalyticsNotif
        );
        assert_eq!(
            fsm.transition(ThroughputTransition::AnalyticsNotifSent)
                .unwrap(),
            ThroughputState::WaitingForGmlcNotif
        );
    }

    #[test]
    fn deletion_is_reachable_from_any_state() {
        let table = throughput_state_table();
        for start in [
            ThroughputState::Initializing,
            ThroughputState::WaitingForGmlcNotif,
            ThroughputState::WaitingForRanNotif,
            ThroughputState::PredictingThroughput,
            ThroughputState::SendingAnalyticsNotif,
        ] {
            let mut fsm = FiniteStateMachine::new(table, start);
            assert_eq!(
                fsm.transition(ThroughputTransition::DeletionRequested)
                    .unwrap(),
                ThroughputState::Deleting
            );
        }
    }

    #[test]
    fn waiting_states_alternate_when_only_one_side_has_arrived() {
        let table = throughput_state_table();
        let mut fsm = FiniteStateMachine::new(table, ThroughputState::WaitingForGmlcNotif);
        assert_eq!(
            fsm.transition(ThroughputTransition::WaitingForNotifs)
                .unwrap(),
            ThroughputState::WaitingForRanNotif
        );
        assert_eq!(
            fsm.transition(ThroughputTransition::WaitingForNotifs)
                .unwrap(),
            ThroughputState::WaitingForGmlcNotif
        );
    }
}
