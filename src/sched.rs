use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use crate::core::Timestamp;

/// Handle for a scheduled timer. Stale after the timer fires or is cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Handle for an outstanding animation-frame request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequestId(pub u64);

#[derive(Debug)]
struct Entry<T> {
    due: Timestamp,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// Deterministic timer queue over virtual time.
///
/// Timers at the same instant fire in the order they were scheduled.
/// Cancellation is lazy; cancelled entries are skipped on pop.
#[derive(Debug)]
pub struct Scheduler<T> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    live: HashSet<u64>,
    next_seq: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashSet::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, due: Timestamp, task: T) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.live.insert(seq);
        self.heap.push(Reverse(Entry { due, seq, task }));
        TimerId(seq)
    }

    /// Returns false if the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.live.remove(&id.0)
    }

    /// Next timer due at or before `now`, if any.
    pub fn pop_due(&mut self, now: Timestamp) -> Option<(Timestamp, T)> {
        while let Some(Reverse(head)) = self.heap.peek() {
            if head.due > now {
                return None;
            }
            let Reverse(entry) = self.heap.pop()?;
            if self.live.remove(&entry.seq) {
                return Some((entry.due, entry.task));
            }
        }
        None
    }

    /// Due time of the earliest live timer.
    pub fn next_due(&mut self) -> Option<Timestamp> {
        while let Some(Reverse(head)) = self.heap.peek() {
            if self.live.contains(&head.seq) {
                return Some(head.due);
            }
            self.heap.pop();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order() {
        let mut sched = Scheduler::new();
        sched.schedule(Timestamp(30), "c");
        sched.schedule(Timestamp(10), "a");
        sched.schedule(Timestamp(20), "b");

        let mut fired = Vec::new();
        while let Some((_, task)) = sched.pop_due(Timestamp(100)) {
            fired.push(task);
        }
        assert_eq!(fired, vec!["a", "b", "c"]);
    }

    #[test]
    fn ties_fire_in_schedule_order() {
        let mut sched = Scheduler::new();
        sched.schedule(Timestamp(10), 1);
        sched.schedule(Timestamp(10), 2);
        sched.schedule(Timestamp(10), 3);

        let mut fired = Vec::new();
        while let Some((_, task)) = sched.pop_due(Timestamp(10)) {
            fired.push(task);
        }
        assert_eq!(fired, vec![1, 2, 3]);
    }

    #[test]
    fn future_timers_stay_queued() {
        let mut sched = Scheduler::new();
        sched.schedule(Timestamp(50), ());
        assert!(sched.pop_due(Timestamp(49)).is_none());
        assert_eq!(sched.len(), 1);
        assert!(sched.pop_due(Timestamp(50)).is_some());
        assert!(sched.is_empty());
    }

    #[test]
    fn cancelled_timers_are_skipped() {
        let mut sched = Scheduler::new();
        let a = sched.schedule(Timestamp(10), "a");
        sched.schedule(Timestamp(20), "b");

        assert!(sched.cancel(a));
        assert!(!sched.cancel(a));

        let (due, task) = sched.pop_due(Timestamp(100)).unwrap();
        assert_eq!((due, task), (Timestamp(20), "b"));
        assert!(sched.is_empty());
    }

    #[test]
    fn next_due_prunes_cancelled_heads() {
        let mut sched = Scheduler::new();
        let a = sched.schedule(Timestamp(10), ());
        sched.schedule(Timestamp(25), ());
        sched.cancel(a);
        assert_eq!(sched.next_due(), Some(Timestamp(25)));
    }

    #[test]
    fn clear_drops_everything() {
        let mut sched = Scheduler::new();
        sched.schedule(Timestamp(10), ());
        sched.schedule(Timestamp(20), ());
        sched.clear();
        assert!(sched.is_empty());
        assert!(sched.pop_due(Timestamp(100)).is_none());
    }
}
