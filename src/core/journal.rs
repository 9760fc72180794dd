//! Dispatch trace: a timestamped record of fired transitions.
//!
//! The journal is purely diagnostic. It never influences dispatch and is the
//! only part of the runtime state that serializes; applications export it to
//! inspect what a machine did and when.

use crate::core::EventId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single fired transition.
///
/// States are recorded by name (names are diagnostics; identity stays with
/// the arena). `internal` marks self-transitions that ran without entry or
/// exit hooks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Name of the machine whose table fired the transition.
    pub machine: String,
    /// Name of the source state.
    pub from: String,
    /// Name of the target state.
    pub to: String,
    /// Identifier of the triggering event.
    pub event: EventId,
    /// When the transition committed.
    pub at: DateTime<Utc>,
    /// Whether this was an internal (hook-suppressing) transition.
    pub internal: bool,
}

/// Ordered trace of fired transitions.
///
/// Unbounded by default; [`set_limit`](TransitionJournal::set_limit) turns it
/// into a sliding window that drops the oldest records first.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use strata::core::{EventId, TransitionJournal, TransitionRecord};
///
/// let mut journal = TransitionJournal::new();
/// journal.record(TransitionRecord {
///     machine: "player".into(),
///     from: "paused".into(),
///     to: "playing".into(),
///     event: EventId::new(1),
///     at: Utc::now(),
///     internal: false,
/// });
///
/// assert_eq!(journal.len(), 1);
/// assert_eq!(journal.records()[0].to, "playing");
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionJournal {
    records: Vec<TransitionRecord>,
    limit: Option<usize>,
}

impl TransitionJournal {
    /// Create an empty, unbounded journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the journal to `limit` records, dropping the oldest on overflow.
    /// `None` removes the bound.
    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
        self.trim();
    }

    /// Append a record.
    pub fn record(&mut self, record: TransitionRecord) {
        self.records.push(record);
        self.trim();
    }

    /// All recorded transitions, oldest first.
    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    /// The most recent transition, if any.
    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.last()
    }

    /// Number of recorded transitions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Elapsed time between the first and last recorded transition.
    ///
    /// Returns `None` with fewer than one record, or when clock adjustments
    /// make the span negative.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.first()?, self.records.last()?);
        last.at.signed_duration_since(first.at).to_std().ok()
    }

    /// Discard all records. The limit is retained.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn trim(&mut self) {
        if let Some(limit) = self.limit {
            while self.records.len() > limit {
                self.records.remove(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(from: &str, to: &str, event: u32) -> TransitionRecord {
        TransitionRecord {
            machine: "m".into(),
            from: from.into(),
            to: to.into(),
            event: EventId::new(event),
            at: Utc::now(),
            internal: false,
        }
    }

    #[test]
    fn records_preserve_order() {
        let mut journal = TransitionJournal::new();
        journal.record(record("a", "b", 1));
        journal.record(record("b", "c", 2));

        let froms: Vec<&str> = journal.records().iter().map(|r| r.from.as_str()).collect();
        assert_eq!(froms, vec!["a", "b"]);
        assert_eq!(journal.last().map(|r| r.to.as_str()), Some("c"));
    }

    #[test]
    fn limit_drops_oldest_records() {
        let mut journal = TransitionJournal::new();
        journal.set_limit(Some(2));
        journal.record(record("a", "b", 1));
        journal.record(record("b", "c", 2));
        journal.record(record("c", "d", 3));

        assert_eq!(journal.len(), 2);
        assert_eq!(journal.records()[0].from, "b");
    }

    #[test]
    fn lowering_limit_trims_existing_records() {
        let mut journal = TransitionJournal::new();
        journal.record(record("a", "b", 1));
        journal.record(record("b", "c", 2));
        journal.record(record("c", "d", 3));

        journal.set_limit(Some(1));
        assert_eq!(journal.len(), 1);
        assert_eq!(journal.records()[0].from, "c");
    }

    #[test]
    fn duration_requires_records() {
        let journal = TransitionJournal::new();
        assert!(journal.duration().is_none());

        let mut journal = TransitionJournal::new();
        journal.record(record("a", "b", 1));
        assert!(journal.duration().is_some());
    }

    #[test]
    fn journal_round_trips_through_serde() {
        let mut journal = TransitionJournal::new();
        journal.record(record("a", "b", 1));
        journal.record(TransitionRecord {
            internal: true,
            ..record("b", "b", 2)
        });

        let json = serde_json::to_string(&journal).unwrap();
        let back: TransitionJournal = serde_json::from_str(&json).unwrap();

        assert_eq!(back.records(), journal.records());
        assert!(back.records()[1].internal);
    }

    #[test]
    fn clear_retains_limit() {
        let mut journal = TransitionJournal::new();
        journal.set_limit(Some(1));
        journal.record(record("a", "b", 1));
        journal.clear();

        assert!(journal.is_empty());
        journal.record(record("b", "c", 2));
        journal.record(record("c", "d", 3));
        assert_eq!(journal.len(), 1);
    }
}
