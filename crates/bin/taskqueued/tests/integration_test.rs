//! End-to-end tests for the full taskqueued stack.
//!
//! Each test wires the real adapters (filesystem template store, simulated
//! observatory, tokio process runner) into the app services and runs a
//! queue. Template files, collections and scripts live in a temporary
//! directory.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;

use taskqueue_adapter_process_tokio::TokioProcessRunner;
use taskqueue_adapter_storage_fs::{FsQueueStore, FsTemplateStore, USER_CATALOG_FILE};
use taskqueue_adapter_virtual::VirtualDevices;
use taskqueue_app::actions::{ActionRunner, ActionSettings};
use taskqueue_app::event_bus::ExecutorEventBus;
use taskqueue_app::executor::QueueExecutor;
use taskqueue_app::ports::DeviceAccess;
use taskqueue_app::services::{QueueService, TemplateManager, populate};
use taskqueue_app::shared_queue::{SharedQueue, lock_queue, shared_queue};
use taskqueue_domain::collection::{Collection, CollectionEntry};
use taskqueue_domain::property::ElementValue;
use taskqueue_domain::queue::{QueueItemStatus, QueueManager, QueueState};

struct Stack {
    root: TempDir,
    templates: TemplateManager<FsTemplateStore>,
    devices: VirtualDevices,
    queue: SharedQueue,
}

impl Stack {
    /// Write the given system templates and load the catalog.
    async fn new(system: &[Value]) -> Self {
        let root = tempfile::tempdir().unwrap();
        let system_dir = root.path().join("templates/system");
        std::fs::create_dir_all(&system_dir).unwrap();
        for template in system {
            let file = system_dir.join(format!("{}.json", template["id"].as_str().unwrap()));
            std::fs::write(file, serde_json::to_vec_pretty(template).unwrap()).unwrap();
        }
        let store = FsTemplateStore::new(system_dir, root.path().join("templates/user"));
        let mut templates = TemplateManager::new(store);
        templates.initialize().await.unwrap();
        Self {
            root,
            templates,
            devices: VirtualDevices::observatory(Duration::from_millis(20)),
            queue: shared_queue(QueueManager::new()),
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn enqueue(&self, entries: Vec<(&str, &str, Value)>) {
        let collection = Collection {
            name: "test".to_string(),
            description: String::new(),
            tasks: entries
                .into_iter()
                .map(|(template_id, device, parameters)| CollectionEntry {
                    template_id: template_id.to_string(),
                    device: device.to_string(),
                    parameters: parameters.as_object().cloned().unwrap_or_default(),
                })
                .collect(),
        };
        let report = populate(&mut lock_queue(&self.queue), &self.templates, &collection);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    fn executor(&self) -> QueueExecutor<VirtualDevices, TokioProcessRunner> {
        let settings = ActionSettings {
            poll_interval: Duration::from_millis(20),
            schedule_progress_interval: Duration::from_secs(1),
        };
        let runner = ActionRunner::new(self.devices.clone(), TokioProcessRunner, settings);
        QueueExecutor::new(self.queue.clone(), runner, ExecutorEventBus::new(64))
    }

    fn statuses(&self) -> Vec<QueueItemStatus> {
        lock_queue(&self.queue)
            .items()
            .iter()
            .map(|item| item.status())
            .collect()
    }

    fn error_of(&self, index: usize) -> Option<String> {
        lock_queue(&self.queue).items()[index].error_message.clone()
    }
}

fn park() -> Value {
    json!({
        "id": "mount_park",
        "name": "Park Telescope",
        "category": "Mount",
        "supported_interfaces": [2],
        "actions": [{"type": "SET", "property": "TELESCOPE_PARK", "element": "PARK", "value": true, "timeout": 5}]
    })
}

fn goto() -> Value {
    json!({
        "id": "mount_goto",
        "name": "Slew",
        "category": "Mount",
        "supported_interfaces": [2],
        "parameters": [{"name": "ra", "type": "number", "min": 0, "max": 24}],
        "actions": [{"type": "SET", "property": "EQUATORIAL_EOD_COORD", "element": "RA", "value": "${ra}", "timeout": 5}]
    })
}

fn cool() -> Value {
    json!({
        "id": "ccd_cool",
        "name": "Cool Camera",
        "category": "Camera",
        "supported_interfaces": [4],
        "parameters": [{"name": "temperature", "type": "number", "default": -10}],
        "actions": [
            {"type": "SET", "property": "CCD_TEMPERATURE", "element": "CCD_TEMPERATURE_VALUE", "value": "${temperature}", "timeout": 5},
            {"type": "EVALUATE", "property": "CCD_COOLER", "element": "COOLER_ON", "property_type": "SWITCH", "condition": "EQUALS", "target": true, "timeout": 5}
        ]
    })
}

fn script() -> Value {
    json!({
        "id": "run_script",
        "name": "Run Script",
        "category": "Utility",
        "parameters": [{"name": "script", "type": "file"}],
        "actions": [{"type": "SCRIPT", "path": "${script}", "timeout": 5, "failure_action": "skip_to_next_task"}]
    })
}

fn wait() -> Value {
    json!({
        "id": "wait",
        "name": "Wait",
        "category": "Utility",
        "parameters": [{"name": "seconds", "type": "number", "default": 0}],
        "actions": [{"type": "DELAY", "duration": "${seconds}"}]
    })
}

#[tokio::test]
async fn should_run_collection_against_simulated_observatory() {
    let stack = Stack::new(&[park(), cool(), script(), wait()]).await;
    let marker = stack.path("ran");
    let announce = stack.script("announce.sh", &format!("echo hello\ntouch {}", marker.display()));
    stack.enqueue(vec![
        ("ccd_cool", "", json!({"temperature": -15})),
        ("run_script", "", json!({"script": announce.display().to_string()})),
        ("mount_park", "Telescope Simulator", json!({})),
    ]);

    let state = stack.executor().run().await.unwrap();

    assert_eq!(state, QueueState::Completed);
    assert_eq!(stack.statuses(), vec![QueueItemStatus::Completed; 3]);
    assert!(marker.exists());
    let cooled = lock_queue(&stack.queue).items()[0].task.device.clone();
    assert_eq!(cooled, "CCD Simulator");
    let park = stack
        .devices
        .property("Telescope Simulator", "TELESCOPE_PARK")
        .await
        .unwrap();
    assert_eq!(park.element("PARK").unwrap().value, ElementValue::Switch(true));
}

#[tokio::test]
async fn should_skip_task_when_script_fails_and_keep_running() {
    let stack = Stack::new(&[script(), wait()]).await;
    let failing = stack.script("fail.sh", "echo nope >&2\nexit 3");
    stack.enqueue(vec![
        ("run_script", "", json!({"script": failing.display().to_string()})),
        ("wait", "", json!({})),
    ]);

    let state = stack.executor().run().await.unwrap();

    assert_eq!(state, QueueState::Completed);
    assert_eq!(
        stack.statuses(),
        vec![QueueItemStatus::Skipped, QueueItemStatus::Completed]
    );
    assert_eq!(stack.error_of(0).as_deref(), Some("Script exited with code 3"));
}

#[tokio::test]
async fn should_abort_queue_when_parked_mount_refuses_slew() {
    let stack = Stack::new(&[park(), goto(), wait()]).await;
    stack.enqueue(vec![
        ("mount_park", "Telescope Simulator", json!({})),
        ("mount_goto", "Telescope Simulator", json!({"ra": 5.5})),
        ("wait", "", json!({})),
    ]);

    let state = stack.executor().run().await.unwrap();

    assert_eq!(state, QueueState::Aborted);
    assert_eq!(
        stack.statuses(),
        vec![
            QueueItemStatus::Completed,
            QueueItemStatus::Failed,
            QueueItemStatus::Pending
        ]
    );
    assert!(stack.error_of(1).unwrap().contains("Alert state"));
}

#[tokio::test]
async fn should_abort_running_delay_through_handle() {
    let stack = Stack::new(&[wait()]).await;
    stack.enqueue(vec![("wait", "", json!({"seconds": 60}))]);
    let executor = stack.executor();
    let handle = executor.handle();

    let aborter = tokio::spawn(async move {
        while !handle.is_running() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort()
    });
    let state = executor.run().await.unwrap();

    assert!(aborter.await.unwrap());
    assert_eq!(state, QueueState::Aborted);
    assert_eq!(stack.statuses(), vec![QueueItemStatus::Failed]);
    assert_eq!(stack.error_of(0).as_deref(), Some("Action aborted"));
}

#[tokio::test]
async fn should_save_finished_queue_and_restore_it() {
    let stack = Stack::new(&[wait()]).await;
    stack.enqueue(vec![("wait", "", json!({})), ("wait", "", json!({"seconds": 0}))]);
    stack.executor().run().await.unwrap();
    let service = QueueService::new(FsQueueStore);
    let path = stack.path("queues/tonight.json");

    service.save(&stack.queue, &path).await.unwrap();
    let restored = shared_queue(QueueManager::new());
    let count = service.load(&restored, &path).await.unwrap();

    assert_eq!(count, 2);
    let restored = lock_queue(&restored);
    assert_eq!(restored.state(), QueueState::Completed);
    assert!(
        restored
            .items()
            .iter()
            .all(|item| item.status() == QueueItemStatus::Completed)
    );
}

#[tokio::test]
async fn should_persist_user_template_across_reloads() {
    let mut stack = Stack::new(&[cool()]).await;
    let overrides = json!({"temperature": -25});

    let created = stack
        .templates
        .create_user_template("ccd_cool", "Deep Cool", overrides.as_object().unwrap())
        .await
        .unwrap();
    stack.templates.reload().await.unwrap();

    assert!(user_catalog(stack.root.path()).is_file());
    let reloaded = stack.templates.get_template(&created.id).unwrap();
    assert!(!reloaded.is_system());
    assert_eq!(reloaded.parameter("temperature").unwrap().default, Some(json!(-25)));
}

fn user_catalog(root: &Path) -> PathBuf {
    root.join("templates/user").join(USER_CATALOG_FILE)
}
