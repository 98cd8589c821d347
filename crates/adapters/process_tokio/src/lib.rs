//! # taskqueue-adapter-process-tokio
//!
//! [`ProcessRunner`] backed by `tokio::process`.
//!
//! The child is spawned with `kill_on_drop`, so abandoning the run future
//! (timeout, abort) terminates it. Stdout and stderr are read line by line
//! and forwarded as they arrive.
//!
//! ## Dependency rule
//!
//! Depends on `taskqueue-app` (port traits) and `taskqueue-domain` only.

use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use taskqueue_app::ports::{OutputLine, OutputStream, ProcessCommand, ProcessExit, ProcessRunner};
use taskqueue_domain::error::ProcessError;

/// Runs scripts as child processes of the current runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl ProcessRunner for TokioProcessRunner {
    fn check_executable(&self, path: &Path) -> impl Future<Output = Result<(), ProcessError>> + Send {
        let path = path.to_path_buf();
        async move {
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    return Err(ProcessError::NotFound(path));
                }
                Err(err) => return Err(ProcessError::Io(err)),
            };
            if !metadata.is_file() {
                return Err(ProcessError::NotAFile(path));
            }
            if !is_executable(&metadata) {
                return Err(ProcessError::NotExecutable(path));
            }
            Ok(())
        }
    }

    fn run(
        &self,
        command: &ProcessCommand,
        output: mpsc::UnboundedSender<OutputLine>,
    ) -> impl Future<Output = Result<ProcessExit, ProcessError>> + Send {
        let command = command.clone();
        async move {
            let mut child = build(&command).spawn().map_err(|source| ProcessError::Spawn {
                path: command.program.clone(),
                source,
            })?;
            tracing::debug!(program = %command.program.display(), pid = ?child.id(), "script started");

            let stdout = child.stdout.take();
            let stderr = child.stderr.take();
            let (status, (), ()) = tokio::join!(
                child.wait(),
                pump(stdout, OutputStream::Stdout, output.clone()),
                pump(stderr, OutputStream::Stderr, output),
            );
            let exit = exit_of(status?);
            tracing::debug!(program = %command.program.display(), code = ?exit.code, "script finished");
            Ok(exit)
        }
    }
}

fn build(command: &ProcessCommand) -> Command {
    let mut process = Command::new(&command.program);
    process
        .args(&command.arguments)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = command.working_directory.as_ref().filter(|d| !d.as_os_str().is_empty()) {
        process.current_dir(dir);
    }
    process
}

async fn pump<R>(reader: Option<R>, stream: OutputStream, output: mpsc::UnboundedSender<OutputLine>)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                // the receiver may be gone already; keep draining the pipe
                let _ = output.send(OutputLine { stream, line });
            }
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(?stream, error = %err, "failed to read script output");
                break;
            }
        }
    }
}

fn exit_of(status: ExitStatus) -> ProcessExit {
    match status.code() {
        Some(code) => ProcessExit::code(code),
        None => {
            tracing::warn!(%status, "script terminated without exit code");
            ProcessExit::crashed()
        }
    }
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::time::Duration;

    use taskqueue_app::ports::ExitKind;

    use super::*;

    fn script(dir: &Path, name: &str, body: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    fn command(program: PathBuf) -> ProcessCommand {
        ProcessCommand {
            program,
            arguments: Vec::new(),
            working_directory: None,
        }
    }

    async fn run(command: &ProcessCommand) -> (ProcessExit, Vec<OutputLine>) {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let exit = TokioProcessRunner.run(command, sender).await.unwrap();
        let mut lines = Vec::new();
        while let Ok(line) = receiver.try_recv() {
            lines.push(line);
        }
        (exit, lines)
    }

    #[tokio::test]
    async fn should_classify_missing_directory_and_plain_files() {
        let dir = tempfile::tempdir().unwrap();
        let plain = script(dir.path(), "plain.sh", "true", 0o644);

        let missing = TokioProcessRunner.check_executable(&dir.path().join("nope.sh")).await;
        let directory = TokioProcessRunner.check_executable(dir.path()).await;
        let not_executable = TokioProcessRunner.check_executable(&plain).await;

        assert!(matches!(missing, Err(ProcessError::NotFound(_))));
        assert!(matches!(directory, Err(ProcessError::NotAFile(_))));
        assert!(matches!(not_executable, Err(ProcessError::NotExecutable(_))));
    }

    #[tokio::test]
    async fn should_accept_executable_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(dir.path(), "ok.sh", "exit 0", 0o755);
        assert!(TokioProcessRunner.check_executable(&path).await.is_ok());
    }

    #[tokio::test]
    async fn should_stream_both_output_streams_with_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(dir.path(), "talk.sh", "echo \"hello $1\"\necho oops >&2", 0o755);
        let mut command = command(path);
        command.arguments = vec!["sky".to_string()];

        let (exit, lines) = run(&command).await;

        assert_eq!(exit, ProcessExit::success());
        assert!(lines.contains(&OutputLine {
            stream: OutputStream::Stdout,
            line: "hello sky".to_string(),
        }));
        assert!(lines.contains(&OutputLine {
            stream: OutputStream::Stderr,
            line: "oops".to_string(),
        }));
    }

    #[tokio::test]
    async fn should_run_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir(&work).unwrap();
        let path = script(dir.path(), "where.sh", "pwd", 0o755);
        let mut command = command(path);
        command.working_directory = Some(work.clone());

        let (_, lines) = run(&command).await;

        let reported = PathBuf::from(&lines[0].line);
        assert_eq!(reported.canonicalize().unwrap(), work.canonicalize().unwrap());
    }

    #[tokio::test]
    async fn should_report_exit_code_and_signal_death() {
        let dir = tempfile::tempdir().unwrap();
        let failing = script(dir.path(), "fail.sh", "exit 3", 0o755);
        let killed = script(dir.path(), "killed.sh", "kill -9 $$", 0o755);

        let (failed, _) = run(&command(failing)).await;
        let (crashed, _) = run(&command(killed)).await;

        assert_eq!(failed, ProcessExit::code(3));
        assert_eq!(crashed.kind, ExitKind::Crashed);
    }

    #[tokio::test]
    async fn should_kill_child_when_run_future_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let path = script(
            dir.path(),
            "slow.sh",
            &format!("sleep 1\ntouch {}", marker.display()),
            0o755,
        );
        let (sender, _receiver) = mpsc::unbounded_channel();

        let result = tokio::time::timeout(
            Duration::from_millis(200),
            TokioProcessRunner.run(&command(path), sender),
        )
        .await;
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(result.is_err());
        assert!(!marker.exists());
    }
}
