//! Inbound timestamp queue shared by the listener and the cycle engine.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Unbounded FIFO of received clock values.
///
/// Clones share the same queue. The queue serializes access itself, so the
/// listener can push while the engine pops without outside locking.
#[derive(Debug, Clone, Default)]
pub struct Inbox(Arc<Mutex<VecDeque<u64>>>);

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, clock: u64) {
        self.lock().push_back(clock);
    }

    /// Pop the oldest value, returning it with the length left behind.
    pub fn pop(&self) -> Option<(u64, usize)> {
        let mut queue = self.lock();
        queue.pop_front().map(|value| (value, queue.len()))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<u64>> {
        // a panic while holding the lock cannot leave a VecDeque half-written
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
