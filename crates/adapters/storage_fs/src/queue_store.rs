//! Filesystem implementation of [`QueueStore`].

use std::future::Future;
use std::path::Path;

use taskqueue_app::ports::QueueStore;
use taskqueue_domain::collection::Collection;
use taskqueue_domain::error::TaskQueueError;
use taskqueue_domain::queue::QueueSnapshot;

use crate::files::{read_json, write_json};

/// Saved queues and collections as pretty-printed JSON files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsQueueStore;

impl QueueStore for FsQueueStore {
    fn save_queue(
        &self,
        path: &Path,
        snapshot: &QueueSnapshot,
    ) -> impl Future<Output = Result<(), TaskQueueError>> + Send {
        let path = path.to_path_buf();
        let snapshot = snapshot.clone();
        async move {
            write_json(&path, &snapshot).await?;
            Ok(())
        }
    }

    fn load_queue(&self, path: &Path) -> impl Future<Output = Result<QueueSnapshot, TaskQueueError>> + Send {
        let path = path.to_path_buf();
        async move { Ok(read_json(&path).await?) }
    }

    fn load_collection(&self, path: &Path) -> impl Future<Output = Result<Collection, TaskQueueError>> + Send {
        let path = path.to_path_buf();
        async move { Ok(read_json(&path).await?) }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use taskqueue_domain::queue::{QueueItem, QueueItemStatus, QueueState};
    use taskqueue_domain::task::Task;
    use taskqueue_domain::template::TaskTemplate;

    use super::*;

    fn item(seconds: u64) -> QueueItem {
        let template = TaskTemplate::from_json(json!({
            "id": "wait",
            "name": "Wait",
            "category": "Utility",
            "parameters": [{"name": "seconds", "type": "number", "default": 5}],
            "actions": [{"type": "DELAY", "duration": "${seconds}"}]
        }))
        .unwrap();
        let parameters = json!({"seconds": seconds});
        let task = Task::from_template(&template, "", parameters.as_object().unwrap().clone()).unwrap();
        QueueItem::new(task)
    }

    #[tokio::test]
    async fn should_round_trip_queue_with_item_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queues/tonight.json");
        let mut done = item(1);
        done.set_status(QueueItemStatus::Completed);
        let snapshot = QueueSnapshot::new(QueueState::Idle, None, vec![done, item(2)]);

        FsQueueStore.save_queue(&path, &snapshot).await.unwrap();
        let loaded = FsQueueStore.load_queue(&path).await.unwrap();

        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.items[0].status(), QueueItemStatus::Completed);
    }

    #[tokio::test]
    async fn should_fail_whole_load_on_corrupt_queue_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(&path, r#"{"version": "1.0", "items": [{"oops": true}]}"#).unwrap();

        let err = FsQueueStore.load_queue(&path).await.unwrap_err();

        assert!(matches!(err, TaskQueueError::Storage(_)));
    }

    #[tokio::test]
    async fn should_read_collection_with_default_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evening.json");
        std::fs::write(
            &path,
            r#"{"name": "Evening", "tasks": [{"template_id": "wait", "parameters": {"seconds": 3}}]}"#,
        )
        .unwrap();

        let collection = FsQueueStore.load_collection(&path).await.unwrap();

        assert_eq!(collection.name, "Evening");
        assert_eq!(collection.tasks[0].device, "");
        assert_eq!(collection.tasks[0].parameters["seconds"], json!(3));
    }

    #[tokio::test]
    async fn should_report_missing_collection_as_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsQueueStore
            .load_collection(&dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
