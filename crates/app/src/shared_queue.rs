//! The queue shared between the executor and its callers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use taskqueue_domain::queue::QueueManager;

/// Queue manager behind a mutex. The lock is never held across an `.await`.
pub type SharedQueue = Arc<Mutex<QueueManager>>;

#[must_use]
pub fn shared_queue(queue: QueueManager) -> SharedQueue {
    Arc::new(Mutex::new(queue))
}

/// Lock the queue, recovering the guard if a previous holder panicked.
pub fn lock_queue(queue: &SharedQueue) -> MutexGuard<'_, QueueManager> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}
