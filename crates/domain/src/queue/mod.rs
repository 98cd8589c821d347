//! Queue — ordered items awaiting execution, and their persisted form.

mod item;
mod manager;
mod snapshot;

pub use item::{QueueItem, QueueItemStatus};
pub use manager::{QueueManager, QueueStatistics};
pub use snapshot::{QueueSnapshot, SNAPSHOT_VERSION};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Overall state of the queue.
///
/// `Idle → Running ⇄ Paused → {Completed, Aborted} → (stop) → Idle`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Aborted,
}

impl QueueState {
    /// Running or paused: an execution is in progress.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        })
    }
}
