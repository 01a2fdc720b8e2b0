//! Bounded snapshot history.

use flightdeck_core::snapshot::Snapshot;
use std::collections::VecDeque;

/// The last `capacity` snapshots, oldest first.
///
/// Pushing into a full history evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    entries: VecDeque<Snapshot>,
    capacity: usize,
}

impl SnapshotHistory {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.entries.back()
    }

    /// The snapshot before the latest one.
    pub fn previous(&self) -> Option<&Snapshot> {
        let len = self.entries.len();
        if len < 2 {
            return None;
        }
        self.entries.get(len - 2)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightdeck_core::snapshot::Value;

    fn snap(n: f64) -> Snapshot {
        Snapshot::new([("n", Value::from(n))])
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut history = SnapshotHistory::new(3);
        for n in 0..4 {
            history.push(snap(n as f64));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.latest().and_then(|s| s.number("n")), Some(3.0));
        assert_eq!(history.previous().and_then(|s| s.number("n")), Some(2.0));
        let kept: Vec<f64> = history.iter().filter_map(|s| s.number("n")).collect();
        assert_eq!(kept, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn empty_history_has_nothing() {
        let history = SnapshotHistory::new(10);
        assert!(history.is_empty());
        assert!(history.latest().is_none());
        assert!(history.previous().is_none());
    }

    #[test]
    fn single_entry_has_no_previous() {
        let mut history = SnapshotHistory::new(10);
        history.push(snap(1.0));
        assert!(history.latest().is_some());
        assert!(history.previous().is_none());
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut history = SnapshotHistory::new(0);
        history.push(snap(1.0));
        history.push(snap(2.0));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().and_then(|s| s.number("n")), Some(2.0));
    }
}
