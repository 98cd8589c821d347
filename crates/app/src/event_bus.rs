//! In-process executor event bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use taskqueue_domain::id::QueueItemId;

/// Notifications emitted while a queue runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorEvent {
    Started { total: usize },
    Paused,
    Resumed,
    Stopped,
    Aborted,
    Completed,
    ItemStarted { item_id: QueueItemId, name: String },
    ItemCompleted { item_id: QueueItemId },
    ItemFailed { item_id: QueueItemId, error: String },
    ItemSkipped { item_id: QueueItemId, reason: String },
    ActionStarted { item_id: QueueItemId, index: usize, action: String },
    ActionProgress { item_id: QueueItemId, index: usize, message: String },
    ActionCompleted { item_id: QueueItemId, index: usize },
    ActionFailed { item_id: QueueItemId, index: usize, error: String },
    Progress { completed: usize, total: usize },
    Log { message: String },
}

/// Fan-out of executor events over a [`broadcast`] channel.
///
/// Events emitted while nobody listens are discarded.
#[derive(Debug, Clone)]
pub struct ExecutorEventBus {
    sender: broadcast::Sender<ExecutorEvent>,
}

impl ExecutorEventBus {
    /// `capacity` bounds how far a slow listener may lag before it misses events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Listen from now on. Earlier events are not replayed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutorEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutorEvent) {
        // Only fails when nobody listens.
        let _ = self.sender.send(event);
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(ExecutorEvent::Log {
            message: message.into(),
        });
    }
}

impl Default for ExecutorEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
