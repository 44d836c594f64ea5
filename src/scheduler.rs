//! Timer capability injected into an energy source.
//!
//! The source never holds a callback or a pointer to itself inside the
//! scheduler. It schedules a plain [`SourceAction`], keeps the returned
//! [`TimerId`] as a cancellation token, and the driver hands the action back
//! through [`crate::EnergySource::handle`] when it comes due.

use joule_core::SimTime;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(u64);

/// Work an energy source asks to have delivered back to it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceAction {
    PeriodicUpdate,
    RechargeStep,
}

pub trait Scheduler {
    /// Current simulated time. Must never go backwards.
    fn now(&self) -> SimTime;
    fn schedule(&mut self, delay: Duration, action: SourceAction) -> TimerId;
    /// Cancelling an expired or unknown timer is a no-op.
    fn cancel(&mut self, timer: TimerId);
    fn is_pending(&self, timer: TimerId) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Slot {
    at: SimTime,
    id: TimerId,
}

/// Time-ordered queue of payloads.
///
/// Entries due at the same instant pop in the order they were scheduled.
/// Cancelled entries stay in the heap until they surface and are skipped.
#[derive(Debug)]
pub struct EventQueue<E> {
    now: SimTime,
    next_id: u64,
    heap: BinaryHeap<Reverse<Slot>>,
    pending: HashMap<TimerId, E>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            next_id: 0,
            heap: BinaryHeap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn push(&mut self, delay: Duration, payload: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.heap.push(Reverse(Slot {
            at: self.now + delay,
            id,
        }));
        self.pending.insert(id, payload);
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> Option<E> {
        self.pending.remove(&id)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Time of the next live entry.
    pub fn peek_time(&mut self) -> Option<SimTime> {
        while let Some(Reverse(slot)) = self.heap.peek().copied() {
            if self.pending.contains_key(&slot.id) {
                return Some(slot.at);
            }
            self.heap.pop();
        }
        None
    }

    /// Pop the next live entry due at or before `until`, advancing the clock to it.
    pub fn pop_due(&mut self, until: SimTime) -> Option<(SimTime, TimerId, E)> {
        while let Some(Reverse(slot)) = self.heap.peek().copied() {
            if slot.at > until {
                return None;
            }
            self.heap.pop();
            if let Some(payload) = self.pending.remove(&slot.id) {
                self.now = self.now.max(slot.at);
                return Some((slot.at, slot.id, payload));
            }
        }
        None
    }

    /// Move the clock forward without delivering anything. Never moves it backwards.
    pub fn advance_to(&mut self, t: SimTime) {
        self.now = self.now.max(t);
    }
}

impl Scheduler for EventQueue<SourceAction> {
    fn now(&self) -> SimTime {
        self.now
    }

    fn schedule(&mut self, delay: Duration, action: SourceAction) -> TimerId {
        self.push(delay, action)
    }

    fn cancel(&mut self, timer: TimerId) {
        EventQueue::cancel(self, timer);
    }

    fn is_pending(&self, timer: TimerId) -> bool {
        EventQueue::is_pending(self, timer)
    }
}
