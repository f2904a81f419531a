//! FIFO buffer of payloads awaiting delivery.
//!
//! Producers append at the tail while the relay worker peeks at the head and
//! removes it only after the endpoint confirmed receipt. Access is guarded by
//! a `parking_lot::Mutex`, so every operation observes a consistent queue.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Unbounded, internally synchronised queue of formatted payloads.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: Mutex<VecDeque<String>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload at the tail.
    pub fn push(&self, payload: String) {
        self.items.lock().push_back(payload);
    }

    /// Return a copy of the head without removing it.
    pub fn peek(&self) -> Option<String> {
        self.items.lock().front().cloned()
    }

    /// Remove and return the head.
    pub fn remove_head(&self) -> Option<String> {
        self.items.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Copy of the queue contents, head first.
    pub fn snapshot(&self) -> Vec<String> {
        self.items.lock().iter().cloned().collect()
    }
}
