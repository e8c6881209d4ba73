//! Generic state-table-driven FSM engine (spec §4.3 "FSM engine").
//!
//! Every analytics pipeline state machine (AnLF's throughput lifecycle and
//! any future one) is a [`StateTable`] plus a current [`FiniteStateMachine`]
//! instance; the engine itself carries no domain knowledge of states or
//! transitions.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::InvalidTransition;
use crate::metrics::{self, FailureKind};

/// A transition table: for each state, which transitions are legal and
/// which state each one leads to. A transition present under the
/// wildcard key (`None`) is legal from every state (spec §4.3 "the `*` ->
/// DELETING wildcard").
#[derive(Debug, Clone)]
pub struct StateTable<S, T> {
    edges: HashMap<(Option<S>, T), S>,
}

impl<S, T> Default for StateTable<S, T>
where
    S: Eq + Hash,
    T: Eq + Hash,
{
    fn default() -> Self {
        Self {
            edges: HashMap::new(),
        }
    }
}

impl<S, T> StateTable<S, T>
where
    S: Copy + Eq + Hash + Debug,
    T: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `from --transition--> to`.
    pub fn edge(mut self, from: S, transition: T, to: S) -> Self {
        self.edges.insert((Some(from), transition), to);
        self
    }

    /// Registers a transition legal from any state (the `*` wildcard).
    pub fn wildcard_edge(mut self, transition: T, to: S) -> Self {
        self.edges.insert((None, transition), to);
        self
    }

    fn lookup(&self, from: S, transition: T) -> Option<S> {
        self.edges
            .get(&(Some(from), transition))
            .or_else(|| self.edges.get(&(None, transition)))
            .copied()
    }
}

/// A live state-machine instance bound to a [`StateTable`].
#[derive(Debug, Clone)]
pub struct FiniteStateMachine<'a, S, T> {
    table: &'a StateTable<S, T>,
    state: S,
}

impl<'a, S, T> FiniteStateMachine<'a, S, T>
where
    S: Copy + Eq + Hash + Debug,
    T: Copy + Eq + Hash + Debug,
{
    pub fn new(table: &'a StateTable<S, T>, initial: S) -> Self {
        Self {
            table,
            state: initial,
        }
    }

    pub fn state(&self) -> S {
        self.state
    }

    /// Applies `transition`. On success the new state is both returned and
    /// retained as the machine's current state; on failure the machine is
    /// left unchanged (spec §4.3 "an undefined transition leaves state
    /// unchanged and is reported as an error").
    pub fn transition(&mut self, transition: T) -> Result<S, InvalidTransition> {
        match self.table.lookup(self.state, transition) {
            Some(next) => {
                self.state = next;
                Ok(next)
            }
            None => Err(InvalidTransition {
                state: format!("{:?}", self.state),
                transition: format!("{:?}", transition),
            }),
        }
    }
}

/// Logs an `InvalidTransition` at ERROR with the offending `(state,
/// transition)` and counts it, without ever propagating or panicking (spec
/// §7 item 4: "InvalidTransition: log at ERROR ... and never crash").
/// Callers that don't need the resulting state can pass `fsm.transition(t)`
/// straight through.
pub fn log_invalid_transition<S>(result: Result<S, InvalidTransition>) -> Option<S> {
    match result {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::error!(state = %e.state, transition = %e.transition, "illegal FSM transition");
            metrics::failures::incr(FailureKind::InvalidTransition);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum State {
        Initializing,
        Waiting,
        Deleting,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Transition {
        Advance,
        Delete,
    }

    fn table() -> StateTable<State, Transition> {
        StateTable::new()
            .edge(State::Initializing, Transition::Advance, State::Waiting)
            .wildcard_edge(Transition::Delete, State::Deleting)
    }

    #[test]
    fn legal_transition_advances_state() {
        let table = table();
        let mut fsm = FiniteStateMachine::new(&table, State::Initializing);
        assert_eq!(fsm.transition(Transition::Advance).unwrap(), State::Waiting);
    }

    #[test]
    fn wildcard_transition_applies_from_any_state() {
        let table = table();
        let mut fsm = FiniteStateMachine::new(&table, State::Waiting);
        assert_eq!(fsm.transition(Transition::Delete).unwrap(), State::Deleting);
    }

    #[test]
    fn undefined_transition_is_rejected_and_leaves_state_unchanged() {
        let table = table();
        let mut fsm = FiniteStateMachine::new(&table, State::Waiting);
        assert!(fsm.transition(Transition::Advance).is_err());
        assert_eq!(fsm.state(), State::Waiting);
    }
}
