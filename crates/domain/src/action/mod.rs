//! Actions — the asynchronous units of work a task is made of.
//!
//! The set of kinds is closed: [`ActionKind`] is matched exhaustively by the
//! runner, and the `type` discriminator of the wire format selects the
//! variant. Every action shares the retry/timeout/failure-policy fields held
//! by [`TaskAction`].

mod delay;
mod evaluate;
mod script;
mod set;
mod start;

pub use delay::{DelayAction, DelayUnit};
pub use evaluate::{Condition, EvaluateAction, PropertyType, Reading};
pub use script::ScriptAction;
pub use set::SetAction;
pub use start::{StartAction, StartMode};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Lifecycle of a single action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Aborted,
}

impl ActionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }
}

/// What happens to the surrounding task and queue once an action has
/// exhausted its retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    /// Fail the item and stop the whole queue.
    #[default]
    AbortQueue,
    /// Carry on with the next action as if this one succeeded.
    Continue,
    /// Mark the item skipped and move to the next queue item.
    SkipToNextTask,
}

impl fmt::Display for FailureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AbortQueue => "abort_queue",
            Self::Continue => "continue",
            Self::SkipToNextTask => "skip_to_next_task",
        })
    }
}

/// Discriminator of the closed action set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Set,
    Evaluate,
    Delay,
    Start,
    Script,
}

impl ActionType {
    pub const ALL: [Self; 5] = [
        Self::Set,
        Self::Evaluate,
        Self::Delay,
        Self::Start,
        Self::Script,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Set => "SET",
            Self::Evaluate => "EVALUATE",
            Self::Delay => "DELAY",
            Self::Start => "START",
            Self::Script => "SCRIPT",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownActionType(s.to_string()))
    }
}

/// Kind-specific configuration, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Set(SetAction),
    Evaluate(EvaluateAction),
    Delay(DelayAction),
    Start(StartAction),
    Script(ScriptAction),
}

impl ActionKind {
    #[must_use]
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Set(_) => ActionType::Set,
            Self::Evaluate(_) => ActionType::Evaluate,
            Self::Delay(_) => ActionType::Delay,
            Self::Start(_) => ActionType::Start,
            Self::Script(_) => ActionType::Script,
        }
    }
}

/// An action owned by a task: kind-specific configuration plus the shared
/// retry, timeout and failure-policy state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAction {
    #[serde(flatten)]
    pub kind: ActionKind,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub property: String,
    #[serde(
        rename = "timeout",
        default = "default_timeout",
        deserialize_with = "crate::value::lenient::u64"
    )]
    pub timeout_secs: u64,
    #[serde(default, deserialize_with = "crate::value::lenient::u32")]
    pub retries: u32,
    #[serde(default)]
    pub failure_action: FailureAction,
    #[serde(default)]
    pub status: ActionStatus,
    #[serde(default)]
    pub current_retry: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TaskAction {
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            device: String::new(),
            property: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retries: 0,
            failure_action: FailureAction::default(),
            status: ActionStatus::Pending,
            current_retry: 0,
            error_message: None,
        }
    }

    /// Build an action from a fully substituted definition.
    ///
    /// The `type` field is matched case-insensitively against the closed set
    /// of kinds before the definition is decoded.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownActionType`] for an unknown or
    /// missing `type`, and [`ValidationError::InvalidAction`] when the
    /// definition does not decode into that kind.
    pub fn from_definition(index: usize, definition: &Value) -> Result<Self, ValidationError> {
        let Value::Object(object) = definition else {
            return Err(ValidationError::InvalidAction {
                index,
                reason: "definition must be an object".to_string(),
            });
        };
        let tag = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::UnknownActionType(String::new()))?;
        let action_type: ActionType = tag.parse()?;

        let mut normalized = object.clone();
        normalized.insert("type".to_string(), Value::String(action_type.as_str().to_string()));
        serde_json::from_value(Value::Object(normalized)).map_err(|err| {
            ValidationError::InvalidAction {
                index,
                reason: err.to_string(),
            }
        })
    }

    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    #[must_use]
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn with_failure_action(mut self, policy: FailureAction) -> Self {
        self.failure_action = policy;
        self
    }

    #[must_use]
    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }

    #[must_use]
    pub fn status(&self) -> ActionStatus {
        self.status
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn mark_running(&mut self) {
        self.status = ActionStatus::Running;
    }

    pub fn complete(&mut self) {
        self.status = ActionStatus::Completed;
        self.error_message = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = ActionStatus::Failed;
        self.error_message = Some(message.into());
    }

    /// Abort the action. Calling it again, or on a finished action, is a no-op.
    pub fn abort(&mut self) {
        if !self.status.is_terminal() {
            self.status = ActionStatus::Aborted;
            self.error_message = Some("Action aborted".to_string());
        }
    }

    /// Count one more attempt and tell whether it is allowed.
    pub fn increment_retry(&mut self) -> bool {
        self.current_retry += 1;
        self.current_retry <= self.retries
    }

    /// Make the action runnable again from a clean slate.
    pub fn reset_retry(&mut self) {
        self.current_retry = 0;
        self.status = ActionStatus::Pending;
        self.error_message = None;
    }

    /// `device.property.element` for property-bound actions.
    #[must_use]
    pub fn target(&self) -> String {
        match &self.kind {
            ActionKind::Set(SetAction { element, .. })
            | ActionKind::Evaluate(EvaluateAction { element, .. }) => {
                format!("{}.{}.{}", self.device, self.property, element)
            }
            ActionKind::Script(script) => script.path.display().to_string(),
            ActionKind::Delay(_) | ActionKind::Start(_) => self.action_type().to_string(),
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action_type(), self.target())
    }
}
