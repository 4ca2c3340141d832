/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Time-ordered sets of instance keys.
//!
//! The stepper keeps two of these per processor:
//!
//! * the **queue** – admitted, unfinished instances ordered by absolute
//!   deadline, so the first entry is the EDF choice;
//! * the **ready set** – not-yet-released instances ordered by arrival, so
//!   admission at time `t` is a split at `t + 1`.
//!
//! Entries are `(tick, InstanceKey)` pairs.  Because `InstanceKey` orders by
//! task id and then sequence number, equal ticks are broken by the lowest
//! task id, then the lowest sequence number.

use std::collections::BTreeSet;

use crate::task::{InstanceKey, TaskId, Tick};

/// Ordered set of `(tick, key)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSet {
    entries: BTreeSet<(Tick, InstanceKey)>,
}

impl JobSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key` ordered at `at`.  Returns `false` if already present.
    pub fn insert(&mut self, at: Tick, key: InstanceKey) -> bool {
        self.entries.insert((at, key))
    }

    /// Remove `key` ordered at `at`.  Returns `false` if it was not present.
    pub fn remove(&mut self, at: Tick, key: InstanceKey) -> bool {
        self.entries.remove(&(at, key))
    }

    /// Smallest entry: earliest tick, then lowest task id, then lowest number.
    pub fn first(&self) -> Option<(Tick, InstanceKey)> {
        self.entries.first().copied()
    }

    /// Key of the smallest entry.
    pub fn earliest(&self) -> Option<InstanceKey> {
        self.first().map(|(_, key)| key)
    }

    /// Remove and return every entry whose tick is `≤ now`, in order.
    pub fn take_due(&mut self, now: Tick) -> Vec<(Tick, InstanceKey)> {
        let Some(bound) = now.checked_add(1) else {
            return std::mem::take(&mut self.entries).into_iter().collect();
        };
        let later = self.entries.split_off(&(bound, InstanceKey::new(0, 0)));
        std::mem::replace(&mut self.entries, later)
            .into_iter()
            .collect()
    }

    /// Split off every entry belonging to `task_id`.
    pub fn take_task(&mut self, task_id: TaskId) -> JobSet {
        let (moved, kept): (BTreeSet<_>, BTreeSet<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|(_, key)| key.task_id == task_id);
        self.entries = kept;
        JobSet { entries: moved }
    }

    /// Move every entry of `other` into `self`.
    pub fn absorb(&mut self, other: JobSet) {
        self.entries.extend(other.entries);
    }

    pub fn contains_key(&self, key: InstanceKey) -> bool {
        self.entries.iter().any(|(_, k)| *k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = InstanceKey> + '_ {
        self.entries.iter().map(|(_, key)| *key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tick, InstanceKey)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Tick, InstanceKey)> for JobSet {
    fn from_iter<T: IntoIterator<Item = (Tick, InstanceKey)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn k(task_id: TaskId, number: u32) -> InstanceKey {
        InstanceKey::new(task_id, number)
    }

    #[test]
    fn earliest_prefers_lowest_tick() {
        let set: JobSet = [(12, k(1, 0)), (8, k(2, 0)), (16, k(3, 0))]
            .into_iter()
            .collect();
        assert_eq!(set.earliest(), Some(k(2, 0)));
    }

    #[test]
    fn equal_ticks_break_on_task_id_then_number() {
        let set: JobSet = [(10, k(5, 0)), (10, k(2, 3)), (10, k(2, 1))]
            .into_iter()
            .collect();
        assert_eq!(set.earliest(), Some(k(2, 1)));
    }

    #[test]
    fn empty_set_has_no_earliest() {
        assert_eq!(JobSet::new().earliest(), None);
    }

    #[test]
    fn take_due_splits_at_now_inclusive() {
        let mut set: JobSet = [(0, k(1, 0)), (4, k(1, 1)), (4, k(2, 0)), (8, k(1, 2))]
            .into_iter()
            .collect();
        let due = set.take_due(4);
        assert_eq!(due, vec![(0, k(1, 0)), (4, k(1, 1)), (4, k(2, 0))]);
        assert_eq!(set.keys().collect::<Vec<_>>(), vec![k(1, 2)]);
    }

    #[test]
    fn take_due_at_max_tick_drains_everything() {
        let mut set: JobSet = [(3, k(1, 0)), (Tick::MAX, k(1, 1))].into_iter().collect();
        assert_eq!(set.take_due(Tick::MAX).len(), 2);
        assert!(set.is_empty());
    }

    #[test]
    fn take_task_partitions_by_owner() {
        let mut set: JobSet = [(1, k(1, 0)), (2, k(2, 0)), (3, k(1, 1))]
            .into_iter()
            .collect();
        let moved = set.take_task(1);
        assert_eq!(moved.keys().collect::<Vec<_>>(), vec![k(1, 0), k(1, 1)]);
        assert_eq!(set.keys().collect::<Vec<_>>(), vec![k(2, 0)]);
    }

    #[test]
    fn absorb_merges_entries() {
        let mut a: JobSet = [(1, k(1, 0))].into_iter().collect();
        let b: JobSet = [(0, k(2, 0))].into_iter().collect();
        a.absorb(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.earliest(), Some(k(2, 0)));
        assert!(a.contains_key(k(1, 0)));
    }

    #[test]
    fn remove_requires_matching_tick() {
        let mut set: JobSet = [(5, k(1, 0))].into_iter().collect();
        assert!(!set.remove(4, k(1, 0)));
        assert!(set.remove(5, k(1, 0)));
        assert!(set.is_empty());
    }
}
