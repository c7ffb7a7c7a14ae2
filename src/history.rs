//! Recently-viewed history for taskdeck.
//!
//! A recency-ordered, deduplicated sequence of task snapshots. Nodes live in
//! an arena of `Vec` slots (recycled through a free list) and form a doubly
//! linked sequence addressed by slot index, with an id-to-slot map on the
//! side. Record, remove, and reorder are all O(1) amortized regardless of
//! history length; re-recording an id is a remove-then-append, which is why
//! repeated access reorders instead of duplicating.

use std::collections::HashMap;

use crate::task::{AnyTask, TaskId};

#[derive(Debug)]
struct Node {
    task: AnyTask,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Deduplicating most-recently-used list of viewed entities.
#[derive(Debug, Default)]
pub struct HistoryTracker {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<TaskId, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl HistoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a view of `task` at the most-recent position.
    ///
    /// `None`, or an entity whose id is still unset, is a no-op. An id that
    /// is already tracked is unlinked first, so each id appears at most
    /// once.
    pub fn record(&mut self, task: Option<AnyTask>) {
        let Some(task) = task else {
            return;
        };
        let Some(id) = task.id() else {
            return;
        };
        if let Some(slot) = self.index.remove(&id) {
            self.unlink(slot);
        }
        self.push_tail(id, task);
    }

    /// Drop the entry for `id` if present; no-op otherwise.
    pub fn remove(&mut self, id: TaskId) {
        if let Some(slot) = self.index.remove(&id) {
            self.unlink(slot);
        }
    }

    /// Drop each id independently, ignoring ids that are not tracked.
    pub fn remove_ids(&mut self, ids: impl IntoIterator<Item = TaskId>) {
        for id in ids {
            self.remove(id);
        }
    }

    /// Drop every entry; index and sequence become empty.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    /// All tracked entities, oldest first and most recently viewed last,
    /// as a fresh copy independent of further mutation.
    pub fn history(&self) -> Vec<AnyTask> {
        let mut out = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            if let Some(node) = &self.slots[slot] {
                out.push(node.task.clone());
                cursor = node.next;
            } else {
                break;
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn push_tail(&mut self, id: TaskId, task: AnyTask) {
        let node = Node {
            task,
            prev: self.tail,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        match self.tail {
            Some(old_tail) => {
                if let Some(prev_node) = self.slots[old_tail].as_mut() {
                    prev_node.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.index.insert(id, slot);
    }

    fn unlink(&mut self, slot: usize) {
        let Some(node) = self.slots[slot].take() else {
            return;
        };
        match node.prev {
            Some(prev) => {
                if let Some(prev_node) = self.slots[prev].as_mut() {
                    prev_node.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                if let Some(next_node) = self.slots[next].as_mut() {
                    next_node.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }
        self.free.push(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Task, TaskStatus};

    fn task(id: TaskId) -> AnyTask {
        AnyTask::Task(Task::new(format!("T{id}"), "", TaskStatus::New).with_id(id))
    }

    fn ids(tracker: &HistoryTracker) -> Vec<TaskId> {
        tracker.history().iter().filter_map(AnyTask::id).collect()
    }

    #[test]
    fn records_in_access_order() {
        let mut tracker = HistoryTracker::new();
        for id in [1, 2, 3] {
            tracker.record(Some(task(id)));
        }
        assert_eq!(ids(&tracker), vec![1, 2, 3]);
    }

    #[test]
    fn re_recording_moves_to_tail_without_growing() {
        let mut tracker = HistoryTracker::new();
        tracker.record(Some(task(1)));
        tracker.record(Some(task(2)));
        tracker.record(Some(task(1)));
        assert_eq!(tracker.len(), 2);
        assert_eq!(ids(&tracker), vec![2, 1]);
    }

    #[test]
    fn re_recording_replaces_the_snapshot() {
        let mut tracker = HistoryTracker::new();
        let mut t = Task::new("Test 1", "Testing task 1", TaskStatus::New).with_id(1);
        tracker.record(Some(AnyTask::Task(t.clone())));

        t.status = TaskStatus::InProgress;
        tracker.record(Some(AnyTask::Task(t)));

        assert_eq!(tracker.len(), 1);
        match &tracker.history()[0] {
            AnyTask::Task(stored) => assert_eq!(stored.status, TaskStatus::InProgress),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn recording_nothing_is_a_noop() {
        let mut tracker = HistoryTracker::new();
        tracker.record(None);
        assert!(tracker.is_empty());

        // An id-less entity cannot be indexed either.
        tracker.record(Some(AnyTask::Task(Task::new("x", "", TaskStatus::New))));
        assert!(tracker.is_empty());
    }

    #[test]
    fn removal_keeps_remaining_order() {
        let mut tracker = HistoryTracker::new();
        for id in [2, 1, 3] {
            tracker.record(Some(task(id)));
        }
        tracker.remove(1);
        tracker.remove(3);
        assert_eq!(ids(&tracker), vec![2]);

        tracker.remove(42);
        assert_eq!(ids(&tracker), vec![2]);
    }

    #[test]
    fn remove_ids_ignores_untracked() {
        let mut tracker = HistoryTracker::new();
        for id in [1, 2, 3, 4] {
            tracker.record(Some(task(id)));
        }
        tracker.remove_ids([2, 4, 99]);
        assert_eq!(ids(&tracker), vec![1, 3]);
    }

    #[test]
    fn clear_empties_everything() {
        let mut tracker = HistoryTracker::new();
        tracker.record(Some(task(1)));
        tracker.record(Some(task(2)));
        assert_eq!(tracker.len(), 2);

        tracker.clear();
        assert!(tracker.is_empty());
        assert!(tracker.history().is_empty());

        tracker.record(Some(task(3)));
        assert_eq!(ids(&tracker), vec![3]);
    }

    #[test]
    fn freed_slots_are_recycled() {
        let mut tracker = HistoryTracker::new();
        for id in 0..8 {
            tracker.record(Some(task(id)));
        }
        for id in 0..8 {
            tracker.record(Some(task(id)));
        }
        // Every re-record freed one slot and reused it.
        assert_eq!(tracker.slots.len(), 8);
        assert_eq!(ids(&tracker), (0..8).collect::<Vec<_>>());
    }
}
