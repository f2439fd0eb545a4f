//! Fixed-capacity queue that never blocks its producers.
//!
//! When a push would exceed the capacity the oldest entry is evicted and
//! handed back to the caller. Consumers either take the oldest entry first
//! (`TakeOrder::Fifo`, used for map events) or the newest one first
//! (`TakeOrder::Lifo`, used for tile requests, where the most recently
//! requested tile is the one most likely to still be on screen).

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeOrder {
    Fifo,
    Lifo,
}

#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    order: TakeOrder,
    available: Notify,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize, order: TakeOrder) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            order,
            available: Notify::new(),
        }
    }

    pub fn fifo(capacity: usize) -> Self {
        Self::new(capacity, TakeOrder::Fifo)
    }

    pub fn lifo(capacity: usize) -> Self {
        Self::new(capacity, TakeOrder::Lifo)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry, returning the evicted oldest entry if the queue was full
    pub fn push(&self, item: T) -> Option<T> {
        let dropped = {
            let mut items = self.lock();
            items.push_back(item);
            if items.len() > self.capacity {
                items.pop_front()
            } else {
                None
            }
        };
        self.available.notify_one();
        dropped
    }

    /// Take the next entry without waiting
    pub fn try_pop(&self) -> Option<T> {
        let mut items = self.lock();
        match self.order {
            TakeOrder::Fifo => items.pop_front(),
            TakeOrder::Lifo => items.pop_back(),
        }
    }

    /// Wait until an entry is available and take it
    pub async fn pop(&self) -> T {
        loop {
            if let Some(item) = self.try_pop() {
                return item;
            }
            self.available.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn order(&self) -> TakeOrder {
        self.order
    }

    /// Remove every pending entry
    pub fn clear(&self) {
        self.lock().clear();
    }
}
