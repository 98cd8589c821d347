use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::time::{self, Timestamp};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartMode {
    #[default]
    Asap,
    Scheduled,
}

/// Gate deciding when the rest of a task may run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartAction {
    #[serde(default)]
    pub mode: StartMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<Timestamp>,
}

impl StartAction {
    #[must_use]
    pub fn asap() -> Self {
        Self {
            mode: StartMode::Asap,
            scheduled_time: None,
        }
    }

    #[must_use]
    pub fn at(time: Timestamp) -> Self {
        Self {
            mode: StartMode::Scheduled,
            scheduled_time: Some(time),
        }
    }

    /// Time still to wait at `reference`; `None` means go now.
    ///
    /// A scheduled start without a time behaves like ASAP.
    #[must_use]
    pub fn remaining(&self, reference: Timestamp) -> Option<Duration> {
        match (self.mode, self.scheduled_time) {
            (StartMode::Scheduled, Some(target)) => time::remaining_until(target, reference),
            _ => None,
        }
    }
}
