//! Queue store port — persisted queues and collection recipes.

use std::future::Future;
use std::path::Path;

use taskqueue_domain::collection::Collection;
use taskqueue_domain::error::TaskQueueError;
use taskqueue_domain::queue::QueueSnapshot;

pub trait QueueStore: Send + Sync {
    fn save_queue(
        &self,
        path: &Path,
        snapshot: &QueueSnapshot,
    ) -> impl Future<Output = Result<(), TaskQueueError>> + Send;

    /// Read a whole queue; a corrupt file is an error, never a partial queue.
    fn load_queue(&self, path: &Path) -> impl Future<Output = Result<QueueSnapshot, TaskQueueError>> + Send;

    fn load_collection(&self, path: &Path) -> impl Future<Output = Result<Collection, TaskQueueError>> + Send;
}
