//! Virtual-time discrete-event queue.
//!
//! A min-heap of `(virtual time, sequence, payload)` entries. Events are
//! popped in ascending time order; entries scheduled for the same virtual
//! instant come out in scheduling order (FIFO via the sequence number).
//! Virtual time is in seconds as f64, compared with `total_cmp`.

use std::collections::BinaryHeap;

struct ScheduledEvent<T> {
    at: f64,
    seq: u64,
    payload: T,
}

impl<T> PartialEq for ScheduledEvent<T> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<T> Eq for ScheduledEvent<T> {}

impl<T> PartialOrd for ScheduledEvent<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for ScheduledEvent<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse ordering for min-heap behavior (earliest time first),
        // then by sequence so same-instant events stay FIFO.
        other.at.total_cmp(&self.at).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending events ordered by virtual due time.
pub struct EventQueue<T> {
    heap: BinaryHeap<ScheduledEvent<T>>,
    next_seq: u64,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Enqueue a payload due at absolute virtual time `at`.
    pub fn push(&mut self, at: f64, payload: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScheduledEvent { at, seq, payload });
    }

    /// Remove and return the earliest pending event.
    pub fn pop(&mut self) -> Option<(f64, T)> {
        self.heap.pop().map(|event| (event.at, event.payload))
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
