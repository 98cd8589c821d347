//! Console reporting of executor events and of the template catalog.

use std::fmt::Write as _;

use tokio::sync::broadcast::{Receiver, error::RecvError};

use taskqueue_app::event_bus::ExecutorEvent;
use taskqueue_app::ports::TemplateStore;
use taskqueue_app::services::TemplateManager;

/// Log every executor event until the queue reaches a terminal state.
pub async fn follow_events(mut events: Receiver<ExecutorEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let terminal = matches!(event, ExecutorEvent::Completed | ExecutorEvent::Aborted);
                log_event(&event);
                if terminal {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event reporter lagged behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn log_event(event: &ExecutorEvent) {
    match event {
        ExecutorEvent::Started { total } => tracing::info!(total, "queue started"),
        ExecutorEvent::Paused => tracing::info!("queue paused"),
        ExecutorEvent::Resumed => tracing::info!("queue resumed"),
        ExecutorEvent::Stopped => tracing::info!("queue stopped"),
        ExecutorEvent::Aborted => tracing::warn!("queue aborted"),
        ExecutorEvent::Completed => tracing::info!("queue completed"),
        ExecutorEvent::ItemStarted { item_id, name } => {
            tracing::info!(%item_id, %name, "task started");
        }
        ExecutorEvent::ItemCompleted { item_id } => tracing::info!(%item_id, "task completed"),
        ExecutorEvent::ItemFailed { item_id, error } => {
            tracing::error!(%item_id, %error, "task failed");
        }
        ExecutorEvent::ItemSkipped { item_id, reason } => {
            tracing::warn!(%item_id, %reason, "task skipped");
        }
        ExecutorEvent::ActionStarted { index, action, .. } => {
            tracing::info!(index, %action, "action started");
        }
        ExecutorEvent::ActionProgress { index, message, .. } => {
            tracing::info!(index, "{message}");
        }
        ExecutorEvent::ActionCompleted { index, .. } => tracing::debug!(index, "action completed"),
        ExecutorEvent::ActionFailed { index, error, .. } => {
            tracing::warn!(index, %error, "action failed");
        }
        ExecutorEvent::Progress { completed, total } => {
            tracing::info!(completed, total, "progress");
        }
        ExecutorEvent::Log { message } => tracing::info!("{message}"),
    }
}

/// Render the catalog grouped by category, one template per line.
pub fn catalog<S: TemplateStore>(templates: &TemplateManager<S>) -> String {
    let mut out = String::new();
    for category in templates.categories() {
        let _ = writeln!(out, "{category}");
        for template in templates.templates_by_category(category) {
            let origin = if template.is_system() { "" } else { " (user)" };
            let _ = writeln!(out, "  {:<24} {}{origin}", template.id, template.name);
        }
    }
    out
}
