use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::QueueItemId;
use crate::task::{Task, TaskStatus};
use crate::time::{Timestamp, now};

/// Position of an item in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueItemStatus {
    #[default]
    Pending,
    Scheduled,
    Running,
    Completed,
    Failed,
    Aborted,
    Skipped,
}

impl QueueItemStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Aborted | Self::Skipped
        )
    }

    /// Items the executor may still pick up.
    #[must_use]
    pub fn is_runnable(self) -> bool {
        matches!(self, Self::Pending | Self::Scheduled)
    }

    /// Transitions only move forward, except between pending and scheduled.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        match self {
            Self::Pending | Self::Scheduled => true,
            Self::Running => next.is_terminal(),
            Self::Completed | Self::Failed | Self::Aborted | Self::Skipped => false,
        }
    }
}

impl fmt::Display for QueueItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::Skipped => "skipped",
        })
    }
}

/// A task plus its queue bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub task: Task,
    status: QueueItemStatus,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<Timestamp>,
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub progress_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl QueueItem {
    #[must_use]
    pub fn new(task: Task) -> Self {
        Self {
            id: QueueItemId::new(),
            task,
            status: QueueItemStatus::Pending,
            created_at: now(),
            scheduled_at: None,
            started_at: None,
            ended_at: None,
            progress: 0,
            progress_message: String::new(),
            error_message: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> QueueItemStatus {
        self.status
    }

    /// Move to `next`, stamping the matching timestamp.
    ///
    /// Returns `false` and leaves the item untouched for a backward move.
    pub fn set_status(&mut self, next: QueueItemStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        if self.status == next {
            return true;
        }
        let stamp = now();
        match next {
            QueueItemStatus::Scheduled => self.scheduled_at = Some(stamp),
            QueueItemStatus::Running => self.started_at = Some(stamp),
            status if status.is_terminal() => self.ended_at = Some(stamp),
            _ => {}
        }
        if next == QueueItemStatus::Completed {
            self.progress = 100;
        }
        self.status = next;
        true
    }

    /// Follow the task's status.
    pub fn sync_from_task(&mut self) {
        match self.task.status {
            TaskStatus::Pending => {}
            TaskStatus::Running => {
                self.set_status(QueueItemStatus::Running);
            }
            TaskStatus::Completed => {
                self.set_status(QueueItemStatus::Completed);
            }
            TaskStatus::Failed => {
                self.error_message.clone_from(&self.task.error_message);
                self.set_status(QueueItemStatus::Failed);
            }
            TaskStatus::Aborted => {
                self.set_status(QueueItemStatus::Aborted);
            }
        }
    }

    /// Progress as the share of actions already run.
    pub fn update_progress(&mut self, current_action: usize, message: impl Into<String>) {
        let total = self.task.actions.len();
        self.progress = if total == 0 {
            0
        } else {
            u8::try_from(current_action.min(total) * 100 / total).unwrap_or(100)
        };
        self.progress_message = message.into();
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }
}
