//! Transition table: `(state, event)` keyed lookup.

use crate::core::{EventId, StateId};
use crate::machine::transition::Transition;
use std::collections::HashMap;

/// Mapping from `(from-state, event-id)` to a transition, owned by one
/// machine.
///
/// Keys use state identity, so two states sharing a name remain distinct.
/// The table is populated through the builder and immutable once the machine
/// is built, which is what makes lock-free lookups from the dispatch loop
/// sound.
pub struct TransitionTable<C> {
    entries: HashMap<(StateId, EventId), Transition<C>>,
}

impl<C> TransitionTable<C> {
    pub(crate) fn new() -> Self {
        TransitionTable {
            entries: HashMap::new(),
        }
    }

    /// Insert a transition. Returns `false` when the `(from, trigger)` key
    /// is already occupied, leaving the existing entry in place.
    pub(crate) fn insert(&mut self, transition: Transition<C>) -> bool {
        let key = (transition.from, transition.trigger);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, transition);
        true
    }

    /// Look up the transition for `from` on `event`, if any.
    ///
    /// A miss is not an error; the caller decides whether to bubble the
    /// event to the parent machine or report it unhandled.
    pub fn next(&self, from: StateId, event: EventId) -> Option<&Transition<C>> {
        self.entries.get(&(from, event))
    }

    pub(crate) fn next_mut(&mut self, from: StateId, event: EventId) -> Option<&mut Transition<C>> {
        self.entries.get_mut(&(from, event))
    }

    /// Event identifiers this table reacts to.
    pub fn triggers(&self) -> impl Iterator<Item = EventId> + '_ {
        self.entries.keys().map(|(_, event)| *event)
    }

    /// Number of transitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no transitions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
