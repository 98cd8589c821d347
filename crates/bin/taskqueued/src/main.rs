//! # taskqueued — task queue runner
//!
//! Composition root that wires the adapters together and runs one queue.
//!
//! ## Responsibilities
//! - Parse configuration (CLI args, env vars, config file)
//! - Install the `tracing` subscriber
//! - Load the template catalog from the filesystem store
//! - Build the queue from a saved snapshot and/or a collection file
//! - Run it with the simulated devices and the tokio process runner
//! - Abort on Ctrl-C, save the queue afterwards when asked
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod cli;
mod config;
mod report;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use taskqueue_adapter_process_tokio::TokioProcessRunner;
use taskqueue_adapter_storage_fs::{FsQueueStore, FsTemplateStore};
use taskqueue_adapter_virtual::VirtualDevices;
use taskqueue_app::actions::ActionRunner;
use taskqueue_app::event_bus::ExecutorEventBus;
use taskqueue_app::executor::QueueExecutor;
use taskqueue_app::services::{QueueService, TemplateManager, populate};
use taskqueue_app::shared_queue::{SharedQueue, lock_queue, shared_queue};
use taskqueue_domain::queue::QueueManager;

use crate::cli::Args;
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.logging.filter);

    // Catalog
    let store = FsTemplateStore::new(&config.templates.system_dir, &config.templates.user_dir);
    let mut templates = TemplateManager::new(store);
    templates
        .initialize()
        .await
        .context("failed to load the template catalog")?;

    if args.list_templates {
        print!("{}", report::catalog(&templates));
        return Ok(());
    }

    // Queue
    let queue = shared_queue(QueueManager::new());
    let queue_service = QueueService::new(FsQueueStore);
    if let Some(path) = &args.queue {
        queue_service
            .load(&queue, path)
            .await
            .with_context(|| format!("failed to restore queue from {}", path.display()))?;
    }
    if let Some(path) = &args.collection {
        let collection = queue_service
            .load_collection(path)
            .await
            .with_context(|| format!("failed to read collection {}", path.display()))?;
        let report = populate(&mut lock_queue(&queue), &templates, &collection);
        for warning in &report.warnings {
            tracing::warn!(collection = %path.display(), "{warning}");
        }
    }
    if lock_queue(&queue).next_runnable_index().is_none() {
        tracing::info!("nothing to run");
        return save_if_requested(&queue_service, &queue, args.save.as_deref()).await;
    }

    // Devices and processes
    let devices = VirtualDevices::observatory(config.settle_delay());
    if !config.devices.simulated {
        tracing::warn!("no device runtime configured; device tasks will not run");
        devices.set_available(false);
    }
    let runner = ActionRunner::new(devices, TokioProcessRunner, config.action_settings());

    // Executor
    let events = ExecutorEventBus::new(config.executor.event_capacity);
    let executor = QueueExecutor::new(queue.clone(), runner, events.clone());
    let reporter = tokio::spawn(report::follow_events(events.subscribe()));

    let handle = executor.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && handle.abort() {
            tracing::warn!("interrupted, aborting the queue");
        }
    });

    let state = executor.run().await.context("failed to run the queue")?;
    if let Err(err) = reporter.await {
        tracing::error!(error = %err, "event reporter stopped abnormally");
    }

    let stats = lock_queue(&queue).statistics();
    tracing::info!(
        %state,
        completed = stats.completed,
        failed = stats.failed,
        skipped = stats.skipped,
        pending = stats.pending,
        "run finished"
    );

    save_if_requested(&queue_service, &queue, args.save.as_deref()).await
}

async fn save_if_requested(
    service: &QueueService<FsQueueStore>,
    queue: &SharedQueue,
    path: Option<&Path>,
) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    service
        .save(queue, path)
        .await
        .with_context(|| format!("failed to save queue to {}", path.display()))
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?} ({err}), falling back to info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use taskqueue_domain::queue::QueueState;

    use super::*;

    #[tokio::test]
    async fn should_save_queue_even_when_nothing_is_left_to_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finished.json");
        let queue = shared_queue(QueueManager::new());
        lock_queue(&queue).set_state(QueueState::Completed);
        let service = QueueService::new(FsQueueStore);

        save_if_requested(&service, &queue, Some(&path)).await.unwrap();

        let restored = shared_queue(QueueManager::new());
        service.load(&restored, &path).await.unwrap();
        assert_eq!(lock_queue(&restored).state(), QueueState::Completed);
    }

    #[tokio::test]
    async fn should_write_nothing_without_save_path() {
        let queue = shared_queue(QueueManager::new());
        let service = QueueService::new(FsQueueStore);
        assert!(save_if_requested(&service, &queue, None).await.is_ok());
    }
}
