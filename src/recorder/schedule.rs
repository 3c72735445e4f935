//! Deferred callbacks for playback, cancellable as a group.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::event::PerformanceEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum TimerAction {
    /// Play one event.
    Fire(PerformanceEvent),
    /// The pass is over: loop again or go idle.
    EndOfPass,
}

#[derive(Debug)]
struct Timer {
    due: f64,
    /// Insertion order, so equal due times fire first-in first-out.
    seq: u64,
    action: TimerAction,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    // BinaryHeap is a max-heap; reverse so the earliest timer is on top.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .total_cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Timer>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        TimerQueue::default()
    }

    /// Schedule `action` at absolute time `due`.
    pub fn schedule(&mut self, due: f64, action: TimerAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Timer {
            due,
            seq,
            action,
        });
    }

    /// Drop everything scheduled so far.
    pub fn cancel_all(&mut self) {
        self.heap.clear();
    }

    /// Next timer due at or before `now`, with its due time.
    pub fn pop_due(&mut self, now: f64) -> Option<(f64, TimerAction)> {
        if self.heap.peek()?.due > now {
            return None;
        }
        self.heap.pop().map(|t| (t.due, t.action))
    }

    /// Timers still waiting to fire.
    pub fn pending(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPayload;

    fn pad(i: i32) -> TimerAction {
        TimerAction::Fire(PerformanceEvent::new(EventPayload::pad(i), 0.0))
    }

    #[test]
    fn pops_in_due_order() {
        let mut q = TimerQueue::new();
        q.schedule(2.0, pad(2));
        q.schedule(0.5, pad(0));
        q.schedule(1.0, pad(1));
        assert_eq!(q.pending(), 3);

        assert_eq!(q.pop_due(0.4), None);
        assert_eq!(q.pop_due(5.0), Some((0.5, pad(0))));
        assert_eq!(q.pop_due(5.0), Some((1.0, pad(1))));
        assert_eq!(q.pop_due(5.0), Some((2.0, pad(2))));
        assert_eq!(q.pop_due(5.0), None);
        assert!(q.is_empty());
    }

    #[test]
    fn ties_fire_in_insertion_order() {
        let mut q = TimerQueue::new();
        for i in 0..5 {
            q.schedule(1.0, pad(i));
        }
        q.schedule(1.0, TimerAction::EndOfPass);
        for i in 0..5 {
            assert_eq!(q.pop_due(1.0), Some((1.0, pad(i))));
        }
        assert_eq!(q.pop_due(1.0), Some((1.0, TimerAction::EndOfPass)));
    }

    #[test]
    fn cancel_drops_everything() {
        let mut q = TimerQueue::new();
        q.schedule(0.1, pad(0));
        q.schedule(0.2, TimerAction::EndOfPass);
        q.cancel_all();
        assert_eq!(q.pending(), 0);

        q.schedule(0.3, pad(3));
        assert_eq!(q.pending(), 1);
        assert_eq!(q.pop_due(10.0), Some((0.3, pad(3))));
        assert_eq!(q.pop_due(10.0), None);
    }

    #[test]
    fn repeated_cancel_does_not_accumulate() {
        let mut q = TimerQueue::new();
        for round in 0..1000 {
            // Far-future timers never reach the front on their own.
            q.schedule(1e6 + round as f64, pad(0));
            q.schedule(1e6 + round as f64, TimerAction::EndOfPass);
            q.cancel_all();
        }
        assert_eq!(q.heap.len(), 0, "cancelled timers must not stay queued");
        q.schedule(0.0, pad(1));
        assert_eq!(q.pop_due(0.0), Some((0.0, pad(1))));
    }
}
