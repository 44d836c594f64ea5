//! Observable values.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered list of callbacks sharing one argument type.
pub struct Subscribers<A> {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Box<dyn FnMut(A) + Send>)>,
}

impl<A: Copy> Subscribers<A> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            callbacks: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(A) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(sid, _)| *sid != id);
        self.callbacks.len() != before
    }

    pub fn emit(&mut self, arg: A) {
        for (_, cb) in self.callbacks.iter_mut() {
            cb(arg);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<A: Copy> Default for Subscribers<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Subscribers<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.callbacks.len())
            .finish()
    }
}

/// Remaining energy as a traced scalar: subscribers see `(old_j, new_j)`
/// whenever a write actually changes the value.
#[derive(Debug, Default)]
pub struct RemainingEnergyTrace {
    value: f64,
    subscribers: Subscribers<(f64, f64)>,
}

impl RemainingEnergyTrace {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            subscribers: Subscribers::new(),
        }
    }

    pub fn get(&self) -> f64 {
        self.value
    }

    pub fn set(&mut self, value: f64) {
        if value == self.value {
            return;
        }
        let old = std::mem::replace(&mut self.value, value);
        self.subscribers.emit((old, value));
    }

    pub fn subscribe(
        &mut self,
        callback: impl FnMut((f64, f64)) + Send + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}
