use taskqueue_domain::error::{DeviceError, ProcessError};

/// Why one attempt of an action failed.
///
/// The display text is what ends up on the action, and from there on the
/// queue item, once retries are exhausted.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Timeout waiting for {target} to complete")]
    SettleTimeout { target: String },

    #[error("Timeout evaluating {property}.{element}")]
    EvaluationTimeout { property: String, element: String },

    #[error("Script timed out after {seconds}s")]
    ScriptTimeout { seconds: u64 },

    #[error("Property {target} in Alert state")]
    Alert { target: String },

    #[error("Script exited with code {0}")]
    ScriptExit(i32),

    #[error("Script terminated abnormally")]
    ScriptCrashed,
}

impl ActionError {
    /// Progress line announcing attempt `attempt` of `allowed` retries.
    #[must_use]
    pub fn retry_message(&self, attempt: u32, allowed: u32) -> String {
        match self {
            Self::Alert { .. } => format!("Property in Alert state, retry {attempt}/{allowed}"),
            Self::SettleTimeout { .. } | Self::EvaluationTimeout { .. } | Self::ScriptTimeout { .. } => {
                format!("Timeout, retry {attempt}/{allowed}")
            }
            other => format!("Retry {attempt}/{allowed}: {other}"),
        }
    }
}
