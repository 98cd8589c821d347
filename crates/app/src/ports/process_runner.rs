//! Process runner port — start an executable and follow it to completion.

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use taskqueue_domain::action::ScriptAction;
use taskqueue_domain::error::ProcessError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: PathBuf,
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
}

impl From<&ScriptAction> for ProcessCommand {
    fn from(script: &ScriptAction) -> Self {
        Self {
            program: script.path.clone(),
            arguments: script.arguments.clone(),
            working_directory: script.working_directory.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line written by the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub line: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Normal,
    /// Killed by a signal or otherwise terminated without an exit code.
    Crashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
    pub kind: ExitKind,
}

impl ProcessExit {
    #[must_use]
    pub fn success() -> Self {
        Self::code(0)
    }

    #[must_use]
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            kind: ExitKind::Normal,
        }
    }

    #[must_use]
    pub fn crashed() -> Self {
        Self {
            code: None,
            kind: ExitKind::Crashed,
        }
    }
}

/// Runs external executables.
pub trait ProcessRunner: Send + Sync {
    /// Check that `path` exists, is a regular file and is executable.
    fn check_executable(&self, path: &Path) -> impl Future<Output = Result<(), ProcessError>> + Send;

    /// Start `command`, forward its output lines to `output` and resolve
    /// with its exit status.
    ///
    /// Dropping the returned future must terminate the process.
    fn run(
        &self,
        command: &ProcessCommand,
        output: mpsc::UnboundedSender<OutputLine>,
    ) -> impl Future<Output = Result<ProcessExit, ProcessError>> + Send;
}
