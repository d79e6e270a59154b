//! Transition trace kept for diagnostics.
//!
//! Each completed transition appends a record; the log keeps only the
//! most recent `capacity` records so its memory use stays fixed.

use super::state::StateId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Record of a single completed transition.
///
/// # Example
///
/// ```rust
/// use hsm_runtime::core::{TransitionLog, TransitionRecord};
/// # use hsm_runtime::core::{Reply, StateTree};
/// # let mut tree: StateTree = StateTree::new();
/// # let idle = tree.add_state("Idle", None, |_, e, _| Reply::bubble(e)).unwrap();
/// # let busy = tree.add_state("Busy", None, |_, e, _| Reply::bubble(e)).unwrap();
///
/// let mut log = TransitionLog::with_capacity(4);
/// log.record(TransitionRecord { from: idle, to: busy, at_ms: 120, deferred: false });
///
/// assert_eq!(log.path(), vec![idle, busy]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// The state that was active before the transition
    pub from: StateId,
    /// The state that became active
    pub to: StateId,
    /// Platform time when the transition completed
    pub at_ms: u32,
    /// Whether the transition was requested while another was running
    pub deferred: bool,
}

/// Bounded, ordered log of completed transitions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionLog {
    records: VecDeque<TransitionRecord>,
    capacity: usize,
}

impl TransitionLog {
    /// Log keeping at most `capacity` records; `0` keeps nothing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a record, evicting the oldest when full.
    pub fn record(&mut self, record: TransitionRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// States traversed: the first record's `from`, then every `to`.
    pub fn path(&self) -> Vec<StateId> {
        let mut path = Vec::with_capacity(self.records.len() + 1);
        if let Some(first) = self.records.front() {
            path.push(first.from);
        }
        path.extend(self.records.iter().map(|record| record.to));
        path
    }

    /// Milliseconds between the first and last retained records.
    pub fn span_ms(&self) -> Option<u32> {
        let first = self.records.front()?;
        let last = self.records.back()?;
        Some(last.at_ms.wrapping_sub(first.at_ms))
    }

    pub fn records(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(from: usize, to: usize, at_ms: u32) -> TransitionRecord {
        TransitionRecord {
            from: StateId::new(from),
            to: StateId::new(to),
            at_ms,
            deferred: false,
        }
    }

    #[test]
    fn path_follows_recorded_order() {
        let mut log = TransitionLog::with_capacity(8);
        log.record(record(0, 1, 10));
        log.record(record(1, 2, 20));

        assert_eq!(
            log.path(),
            vec![StateId::new(0), StateId::new(1), StateId::new(2)]
        );
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn oldest_record_is_evicted_when_full() {
        let mut log = TransitionLog::with_capacity(2);
        log.record(record(0, 1, 10));
        log.record(record(1, 2, 20));
        log.record(record(2, 3, 30));

        assert_eq!(log.len(), 2);
        assert_eq!(log.path().first(), Some(&StateId::new(1)));
        assert_eq!(log.last(), Some(&record(2, 3, 30)));
    }

    #[test]
    fn zero_capacity_disables_logging() {
        let mut log = TransitionLog::with_capacity(0);
        log.record(record(0, 1, 10));

        assert!(log.is_empty());
        assert!(log.path().is_empty());
        assert_eq!(log.span_ms(), None);
    }

    #[test]
    fn span_handles_clock_wrap() {
        let mut log = TransitionLog::with_capacity(4);
        log.record(record(0, 1, u32::MAX - 4));
        log.record(record(1, 2, 5));

        assert_eq!(log.span_ms(), Some(10));
    }

    #[test]
    fn log_serializes_to_json() {
        let mut log = TransitionLog::with_capacity(4);
        log.record(record(0, 1, 10));

        let json = serde_json::to_string(&log).unwrap();
        let back: TransitionLog = serde_json::from_str(&json).unwrap();

        assert_eq!(back.path(), log.path());
    }
}
