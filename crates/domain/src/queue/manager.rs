use crate::error::ValidationError;
use crate::id::QueueItemId;

use super::item::{QueueItem, QueueItemStatus};
use super::snapshot::QueueSnapshot;
use super::QueueState;

/// Counts per item status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatistics {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub aborted: usize,
}

/// Ordered collection of queue items. Order is execution order.
///
/// Holds no execution logic; the executor drives state through it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueManager {
    items: Vec<QueueItem>,
    state: QueueState,
    current: Option<QueueItemId>,
}

impl QueueManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn item(&self, index: usize) -> Option<&QueueItem> {
        self.items.get(index)
    }

    #[must_use]
    pub fn item_by_id(&self, id: QueueItemId) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_by_id_mut(&mut self, id: QueueItemId) -> Option<&mut QueueItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    #[must_use]
    pub fn index_of(&self, id: QueueItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    #[must_use]
    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn set_state(&mut self, state: QueueState) {
        self.state = state;
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&QueueItem> {
        self.current.and_then(|id| self.item_by_id(id))
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current.and_then(|id| self.index_of(id))
    }

    pub fn set_current_item(&mut self, id: Option<QueueItemId>) {
        self.current = id;
    }

    pub fn add_item(&mut self, item: QueueItem) -> QueueItemId {
        let id = item.id;
        self.items.push(item);
        id
    }

    /// Insert at `index`, clamped to the end of the queue.
    pub fn insert_item(&mut self, index: usize, item: QueueItem) -> QueueItemId {
        let id = item.id;
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        id
    }

    /// Remove the item at `index` unless it is the one being executed.
    pub fn remove_item(&mut self, index: usize) -> Option<QueueItem> {
        if self.is_locked(index) {
            return None;
        }
        let removed = self.items.remove(index);
        if self.current == Some(removed.id) {
            self.current = None;
        }
        Some(removed)
    }

    /// Move the item at `from` to position `to`.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() || self.is_locked(from) {
            return false;
        }
        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
        }
        true
    }

    pub fn move_up(&mut self, index: usize) -> bool {
        index > 0 && self.move_item(index, index - 1)
    }

    pub fn move_down(&mut self, index: usize) -> bool {
        self.move_item(index, index + 1)
    }

    /// Drop every item.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::QueueRunning`] while a run is in progress,
    /// paused runs included.
    pub fn clear(&mut self) -> Result<(), ValidationError> {
        if self.state.is_active() {
            return Err(ValidationError::QueueRunning);
        }
        self.items.clear();
        self.current = None;
        self.state = QueueState::Idle;
        Ok(())
    }

    /// Index of the first item the executor may start.
    #[must_use]
    pub fn next_runnable_index(&self) -> Option<usize> {
        self.items.iter().position(|item| item.status().is_runnable())
    }

    #[must_use]
    pub fn statistics(&self) -> QueueStatistics {
        let mut stats = QueueStatistics {
            total: self.items.len(),
            ..QueueStatistics::default()
        };
        for item in &self.items {
            match item.status() {
                QueueItemStatus::Pending | QueueItemStatus::Scheduled => stats.pending += 1,
                QueueItemStatus::Running => stats.running += 1,
                QueueItemStatus::Completed => stats.completed += 1,
                QueueItemStatus::Failed => stats.failed += 1,
                QueueItemStatus::Skipped => stats.skipped += 1,
                QueueItemStatus::Aborted => stats.aborted += 1,
            }
        }
        stats
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.statistics().completed
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.statistics().failed
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.statistics().pending
    }

    /// Capture the whole queue for persistence.
    #[must_use]
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot::new(
            self.state,
            self.current_index(),
            self.items.clone(),
        )
    }

    /// Replace the whole queue with a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::QueueRunning`] while a run is in progress;
    /// the current content is kept.
    pub fn restore(&mut self, snapshot: QueueSnapshot) -> Result<(), ValidationError> {
        if self.state.is_active() {
            return Err(ValidationError::QueueRunning);
        }
        let current = snapshot
            .current_index()
            .and_then(|index| snapshot.items.get(index))
            .map(|item| item.id);
        self.state = match snapshot.state {
            QueueState::Running | QueueState::Paused => QueueState::Idle,
            other => other,
        };
        self.items = snapshot.items;
        self.current = current;
        Ok(())
    }

    fn is_locked(&self, index: usize) -> bool {
        match self.items.get(index) {
            None => true,
            Some(item) => {
                self.state.is_active() && item.status() == QueueItemStatus::Running
            }
        }
    }
}
