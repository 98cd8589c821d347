use tokio::sync::mpsc;
use tokio::time::sleep;

use taskqueue_domain::action::{ScriptAction, TaskAction};

use super::{ActionError, ActionRunner, ProgressSink};
use crate::ports::{
    DeviceAccess, ExitKind, OutputLine, OutputStream, ProcessCommand, ProcessExit, ProcessRunner,
};

impl<D, R> ActionRunner<D, R>
where
    D: DeviceAccess,
    R: ProcessRunner,
{
    /// Run the script to completion within the action timeout.
    ///
    /// Leaving early drops the process future, which kills the child.
    pub(super) async fn run_script(
        &self,
        action: &TaskAction,
        script: &ScriptAction,
        progress: &ProgressSink,
    ) -> Result<(), ActionError> {
        self.processes.check_executable(&script.path).await?;

        let command = ProcessCommand::from(script);
        let (sender, mut output) = mpsc::unbounded_channel();
        progress(format!("Running {}", script.path.display()));

        let run = self.processes.run(&command, sender);
        let deadline = sleep(action.timeout());
        tokio::pin!(run);
        tokio::pin!(deadline);

        let exit = loop {
            tokio::select! {
                biased;
                Some(line) = output.recv() => forward(&line, progress),
                result = &mut run => break result?,
                () = &mut deadline => {
                    return Err(ActionError::ScriptTimeout {
                        seconds: action.timeout_secs,
                    });
                }
            }
        };
        while let Ok(line) = output.try_recv() {
            forward(&line, progress);
        }

        match exit {
            ProcessExit {
                code: Some(0),
                kind: ExitKind::Normal,
            } => Ok(()),
            ProcessExit {
                code: Some(code),
                kind: ExitKind::Normal,
            } => Err(ActionError::ScriptExit(code)),
            _ => Err(ActionError::ScriptCrashed),
        }
    }
}

fn forward(line: &OutputLine, progress: &ProgressSink) {
    match line.stream {
        OutputStream::Stdout => tracing::debug!(line = %line.line, "script stdout"),
        OutputStream::Stderr => tracing::debug!(line = %line.line, "script stderr"),
    }
    progress(line.line.clone());
}
