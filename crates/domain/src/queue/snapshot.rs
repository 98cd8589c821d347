use serde::{Deserialize, Serialize};

use super::QueueState;
use super::item::QueueItem;

pub const SNAPSHOT_VERSION: &str = "1.0";

/// Persisted form of a whole queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub version: String,
    #[serde(default)]
    pub state: QueueState,
    /// Index of the current item, `-1` when none.
    #[serde(default = "no_current")]
    pub current_index: i64,
    pub items: Vec<QueueItem>,
}

fn no_current() -> i64 {
    -1
}

impl QueueSnapshot {
    #[must_use]
    pub fn new(state: QueueState, current: Option<usize>, items: Vec<QueueItem>) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            state,
            current_index: current.and_then(|i| i64::try_from(i).ok()).unwrap_or(-1),
            items,
        }
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        usize::try_from(self.current_index).ok()
    }
}
