//! Queue service — persistence of whole queues and collection loading.

use std::path::Path;

use taskqueue_domain::collection::{Collection, CollectionReport};
use taskqueue_domain::error::TaskQueueError;
use taskqueue_domain::queue::{QueueItem, QueueManager};

use crate::ports::{QueueStore, TemplateStore};
use crate::services::TemplateManager;
use crate::shared_queue::{SharedQueue, lock_queue};

/// Application service for saving, restoring and populating queues.
pub struct QueueService<S> {
    store: S,
}

impl<S: QueueStore> QueueService<S> {
    /// Create a new service backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Write the whole queue, nested task and action state included.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error from the store.
    #[tracing::instrument(skip(self, queue, path), fields(path = %path.display()))]
    pub async fn save(&self, queue: &SharedQueue, path: &Path) -> Result<(), TaskQueueError> {
        let snapshot = lock_queue(queue).snapshot();
        self.store.save_queue(path, &snapshot).await?;
        tracing::info!(items = snapshot.items.len(), "queue saved");
        Ok(())
    }

    /// Replace the queue content with a saved one.
    ///
    /// Loading is all-or-nothing: a corrupt file leaves the queue untouched.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error from the store, or
    /// [`TaskQueueError::Validation`] while the queue is running.
    #[tracing::instrument(skip(self, queue, path), fields(path = %path.display()))]
    pub async fn load(&self, queue: &SharedQueue, path: &Path) -> Result<usize, TaskQueueError> {
        let snapshot = self.store.load_queue(path).await?;
        let count = snapshot.items.len();
        lock_queue(queue).restore(snapshot)?;
        tracing::info!(items = count, "queue loaded");
        Ok(count)
    }

    /// Read a collection recipe.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error from the store.
    #[tracing::instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn load_collection(&self, path: &Path) -> Result<Collection, TaskQueueError> {
        self.store.load_collection(path).await
    }
}

/// Append one queue item per collection entry.
///
/// Entries naming an unknown template or failing instantiation are reported
/// as warnings; the others are still added.
pub fn populate<T: TemplateStore>(
    queue: &mut QueueManager,
    templates: &TemplateManager<T>,
    collection: &Collection,
) -> CollectionReport {
    let mut report = CollectionReport::default();
    for entry in &collection.tasks {
        match templates.instantiate(&entry.template_id, &entry.device, &entry.parameters) {
            Ok(task) => {
                queue.add_item(QueueItem::new(task));
                report.added += 1;
            }
            Err(TaskQueueError::NotFound(_)) => {
                report.warn(format!("unknown template: {}", entry.template_id));
            }
            Err(err) => {
                report.warn(format!("{}: {err}", entry.template_id));
            }
        }
    }
    tracing::info!(
        collection = %collection.name,
        added = report.added,
        failed = report.failed,
        "collection loaded"
    );
    report
}
