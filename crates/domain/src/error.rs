//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`TaskQueueError`] via `#[from]`. Resource errors ([`DeviceError`],
//! [`ProcessError`]) are raised by adapters behind the app ports and end up
//! attached to the failing action as a human-readable message.

use std::path::PathBuf;

/// Base error for catalog, queue and persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskQueueError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no template could be loaded")]
    EmptyCatalog,
}

impl TaskQueueError {
    /// Wrap any adapter error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }
}

/// Violations detected synchronously while building templates, tasks or queues.
///
/// These are never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("template id must not be empty")]
    EmptyId,

    #[error("name must not be empty")]
    EmptyName,

    #[error("category must not be empty")]
    EmptyCategory,

    #[error("at least one action is required")]
    NoActions,

    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("parameter {name} must be a number")]
    NotNumeric { name: String },

    #[error("parameter {name} value {value} is below minimum {min}")]
    BelowMinimum { name: String, value: f64, min: f64 },

    #[error("parameter {name} value {value} is above maximum {max}")]
    AboveMaximum { name: String, value: f64, max: f64 },

    #[error("parameter {name} must be text")]
    NotText { name: String },

    #[error("parameter {name} must be a boolean")]
    NotBoolean { name: String },

    #[error("unknown action type: {0}")]
    UnknownActionType(String),

    #[error("action #{index} is invalid: {reason}")]
    InvalidAction { index: usize, reason: String },

    #[error("invalid template document: {0}")]
    InvalidTemplate(String),

    #[error("template {0} is a system template and cannot be modified")]
    SystemTemplateReadOnly(String),

    #[error("operation refused while the queue is running")]
    QueueRunning,
}

/// A lookup that found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Failures reported by the device/property access port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("no device runtime available")]
    Unavailable,

    #[error("device {0} not found")]
    DeviceNotFound(String),

    #[error("device {0} is not connected")]
    NotConnected(String),

    #[error("property {property} not found on {device}")]
    PropertyNotFound { device: String, property: String },

    #[error("element {element} not found in {property}")]
    ElementNotFound { property: String, element: String },

    #[error("property {0} has an unsupported type for this operation")]
    UnsupportedProperty(String),
}

/// Failures reported by the process execution port.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Script not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Script is not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Script is not executable: {}", .0.display())]
    NotExecutable(PathBuf),

    #[error("failed to start {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error while running process: {0}")]
    Io(#[from] std::io::Error),
}
