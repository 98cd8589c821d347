//! Action runner — performs one [`TaskAction`] against the device and
//! process ports.
//!
//! Every kind shares the same attempt loop: a failed attempt is retried while
//! [`TaskAction::increment_retry`] allows it, then the action fails with the
//! message of the last error. An external abort interrupts whichever attempt
//! is in flight; dropping the attempt future releases its property
//! subscription and kills a running script.

mod error;
mod evaluate;
mod script;
mod set;
mod timing;
mod watch;

pub use error::ActionError;

use std::time::Duration;

use tokio::sync::watch as signal;

use taskqueue_domain::action::{ActionKind, ActionStatus, TaskAction};

use crate::ports::{DeviceAccess, ProcessRunner};

/// Sink for human-readable progress lines of the running action.
pub type ProgressSink = dyn Fn(String) + Send + Sync;

/// Timing knobs shared by every action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSettings {
    /// Period of the fallback poll while waiting on a property.
    pub poll_interval: Duration,
    /// Period of the remaining-time message of a scheduled start.
    pub schedule_progress_interval: Duration,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            schedule_progress_interval: Duration::from_secs(30),
        }
    }
}

/// Terminal result of [`ActionRunner::start`], mirrored in the action status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    Failed,
    Aborted,
}

impl ActionOutcome {
    fn of(action: &TaskAction) -> Self {
        match action.status() {
            ActionStatus::Failed => Self::Failed,
            ActionStatus::Aborted => Self::Aborted,
            _ => Self::Completed,
        }
    }
}

/// Receiving end of an abort request.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    receiver: signal::Receiver<bool>,
}

impl AbortSignal {
    #[must_use]
    pub fn new(receiver: signal::Receiver<bool>) -> Self {
        Self { receiver }
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once an abort is requested. Never resolves if the requesting
    /// side is gone without asking.
    pub async fn requested(&mut self) {
        let closed = self.receiver.wait_for(|aborted| *aborted).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Runs actions one at a time against the device and process ports.
pub struct ActionRunner<D, R> {
    devices: D,
    processes: R,
    settings: ActionSettings,
}

impl<D, R> ActionRunner<D, R>
where
    D: DeviceAccess,
    R: ProcessRunner,
{
    pub fn new(devices: D, processes: R, settings: ActionSettings) -> Self {
        Self {
            devices,
            processes,
            settings,
        }
    }

    pub fn devices(&self) -> &D {
        &self.devices
    }

    #[must_use]
    pub fn settings(&self) -> ActionSettings {
        self.settings
    }

    /// Whether the device already shows what the action would produce.
    ///
    /// Only property-bound kinds can be; read failures count as "not done".
    pub async fn is_already_done(&self, action: &TaskAction) -> bool {
        match &action.kind {
            ActionKind::Set(set) => self
                .devices
                .property(&action.device, &action.property)
                .await
                .ok()
                .and_then(|property| {
                    property
                        .element(&set.element)
                        .map(|element| set.is_satisfied_by(&element.value))
                })
                .unwrap_or(false),
            ActionKind::Evaluate(evaluate) => self
                .devices
                .property(&action.device, &action.property)
                .await
                .is_ok_and(|property| evaluate.is_already_done(&property)),
            ActionKind::Delay(_) | ActionKind::Start(_) | ActionKind::Script(_) => false,
        }
    }

    /// Run `action` to a terminal status.
    ///
    /// Progress lines go to `progress`. When `abort` fires first the action
    /// ends up [`ActionStatus::Aborted`].
    pub async fn start(
        &self,
        action: &mut TaskAction,
        abort: &mut AbortSignal,
        progress: &ProgressSink,
    ) -> ActionOutcome {
        let finished = tokio::select! {
            biased;
            () = abort.requested() => false,
            () = self.drive(action, progress) => true,
        };
        if !finished {
            tracing::warn!(action = %action, "action aborted");
            action.abort();
        }
        ActionOutcome::of(action)
    }

    async fn drive(&self, action: &mut TaskAction, progress: &ProgressSink) {
        if self.is_already_done(action).await {
            tracing::debug!(action = %action, "already done, skipping");
            progress(format!("{} already done", action.target()));
            action.complete();
            return;
        }

        action.mark_running();
        loop {
            match self.attempt(action, progress).await {
                Ok(()) => {
                    tracing::debug!(action = %action, "action completed");
                    action.complete();
                    return;
                }
                Err(err) => {
                    if !action.increment_retry() {
                        tracing::warn!(action = %action, error = %err, "action failed");
                        action.fail(err.to_string());
                        return;
                    }
                    let message = err.retry_message(action.current_retry, action.retries);
                    tracing::warn!(action = %action, error = %err, "{message}");
                    progress(message);
                }
            }
        }
    }

    async fn attempt(&self, action: &TaskAction, progress: &ProgressSink) -> Result<(), ActionError> {
        match &action.kind {
            ActionKind::Set(set) => self.run_set(action, set, progress).await,
            ActionKind::Evaluate(evaluate) => self.run_evaluate(action, evaluate, progress).await,
            ActionKind::Delay(delay) => {
                self.run_delay(delay, progress).await;
                Ok(())
            }
            ActionKind::Start(start) => {
                self.run_start(start, progress).await;
                Ok(())
            }
            ActionKind::Script(script) => self.run_script(action, script, progress).await,
        }
    }
}
