//! Queue executor — runs queue items one after the other.
//!
//! The executor owns the run loop; callers steer it through a cloneable
//! [`ExecutorHandle`]. Pausing is cooperative: it takes effect at the next
//! item boundary and never interrupts the running action. Aborting cancels
//! the running action right away.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use taskqueue_domain::action::FailureAction;
use taskqueue_domain::capability::CapabilityMask;
use taskqueue_domain::device::select_device;
use taskqueue_domain::id::QueueItemId;
use taskqueue_domain::queue::{QueueItem, QueueItemStatus, QueueManager, QueueState};
use taskqueue_domain::task::TaskStatus;

use crate::actions::{AbortSignal, ActionOutcome, ActionRunner};
use crate::event_bus::{ExecutorEvent, ExecutorEventBus};
use crate::ports::{DeviceAccess, ProcessRunner};
use crate::shared_queue::{SharedQueue, lock_queue};

/// Why a run could not start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    #[error("the queue is already running")]
    AlreadyRunning,

    #[error("the queue is empty")]
    EmptyQueue,

    #[error("tasks need a device but no device runtime is available")]
    DevicesUnavailable,
}

struct Control {
    running: AtomicBool,
    paused: watch::Sender<bool>,
    abort: watch::Sender<bool>,
}

/// Remote control of a running executor.
#[derive(Clone)]
pub struct ExecutorHandle {
    queue: SharedQueue,
    events: ExecutorEventBus,
    control: Arc<Control>,
}

impl ExecutorHandle {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.control.running.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.control.paused.borrow()
    }

    /// Stop starting new items once the current one is done.
    pub fn pause(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        let mut queue = lock_queue(&self.queue);
        if queue.state() != QueueState::Running {
            return false;
        }
        queue.set_state(QueueState::Paused);
        self.control.paused.send_replace(true);
        tracing::info!("pause requested");
        true
    }

    pub fn resume(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        let mut queue = lock_queue(&self.queue);
        if queue.state() != QueueState::Paused {
            return false;
        }
        queue.set_state(QueueState::Running);
        self.control.paused.send_replace(false);
        tracing::info!("resume requested");
        true
    }

    /// Cancel the running action and stop the queue.
    pub fn abort(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.control.abort.send_replace(true);
        lock_queue(&self.queue).set_state(QueueState::Aborted);
        tracing::warn!("abort requested");
        true
    }

    fn abort_signal(&self) -> AbortSignal {
        AbortSignal::new(self.control.abort.subscribe())
    }
}

/// What the run loop does after an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemFlow {
    Next,
    AbortQueue,
}

/// Holds the running mark. Dropping it clears the control flags first, then
/// the mark.
struct RunningGuard<'a>(&'a Control);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.abort.send_replace(false);
        self.0.paused.send_replace(false);
        self.0.running.store(false, Ordering::SeqCst);
    }
}

/// Runs the items of a shared queue in order.
pub struct QueueExecutor<D, R> {
    runner: ActionRunner<D, R>,
    handle: ExecutorHandle,
}

impl<D, R> QueueExecutor<D, R>
where
    D: DeviceAccess,
    R: ProcessRunner,
{
    pub fn new(queue: SharedQueue, runner: ActionRunner<D, R>, events: ExecutorEventBus) -> Self {
        let (paused, _) = watch::channel(false);
        let (abort, _) = watch::channel(false);
        Self {
            runner,
            handle: ExecutorHandle {
                queue,
                events,
                control: Arc::new(Control {
                    running: AtomicBool::new(false),
                    paused,
                    abort,
                }),
            },
        }
    }

    #[must_use]
    pub fn handle(&self) -> ExecutorHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn queue(&self) -> &SharedQueue {
        &self.handle.queue
    }

    #[must_use]
    pub fn events(&self) -> &ExecutorEventBus {
        &self.handle.events
    }

    /// Run every runnable item, in queue order, until none is left or the
    /// queue is aborted.
    ///
    /// # Errors
    ///
    /// Refuses to start when already running, when the queue is empty, or
    /// when some task needs a device while no device runtime is available.
    pub async fn run(&self) -> Result<QueueState, ExecutorError> {
        let control = &self.handle.control;
        if control.running.swap(true, Ordering::SeqCst) {
            return Err(ExecutorError::AlreadyRunning);
        }
        let _running = RunningGuard(control.as_ref());
        let mut abort = self.handle.abort_signal();
        self.begin(&abort).await?;

        let state = loop {
            if abort.is_requested() {
                break self.finish(QueueState::Aborted);
            }
            let next = lock_queue(&self.handle.queue).next_runnable_index();
            let Some(index) = next else {
                break self.finish(QueueState::Completed);
            };
            if self.handle.is_paused() {
                self.hold(&mut abort).await;
                continue;
            }
            if self.execute_item(index, &mut abort).await == ItemFlow::AbortQueue {
                break self.finish(QueueState::Aborted);
            }
        };
        Ok(state)
    }

    /// Return a finished queue to idle.
    pub fn stop(&self) -> bool {
        if self.handle.is_running() {
            return false;
        }
        let mut queue = lock_queue(&self.handle.queue);
        if !matches!(queue.state(), QueueState::Completed | QueueState::Aborted) {
            return false;
        }
        queue.set_state(QueueState::Idle);
        queue.set_current_item(None);
        drop(queue);
        self.handle.events.emit(ExecutorEvent::Stopped);
        tracing::info!("queue stopped");
        true
    }

    pub fn pause(&self) -> bool {
        self.handle.pause()
    }

    pub fn resume(&self) -> bool {
        self.handle.resume()
    }

    pub fn abort(&self) -> bool {
        self.handle.abort()
    }

    async fn begin(&self, abort: &AbortSignal) -> Result<(), ExecutorError> {
        let (total, needs_device) = {
            let queue = lock_queue(&self.handle.queue);
            let needs_device = queue
                .items()
                .iter()
                .any(|item| item.status().is_runnable() && item.task.requires_device());
            (queue.len(), needs_device)
        };
        if total == 0 {
            return Err(ExecutorError::EmptyQueue);
        }
        if needs_device && !self.runner.devices().is_available().await {
            return Err(ExecutorError::DevicesUnavailable);
        }

        {
            // An abort raised while checking the devices wins.
            let mut queue = lock_queue(&self.handle.queue);
            if !abort.is_requested() {
                queue.set_state(QueueState::Running);
            }
        }
        self.handle.events.emit(ExecutorEvent::Started { total });
        tracing::info!(total, "queue started");
        Ok(())
    }

    async fn hold(&self, abort: &mut AbortSignal) {
        self.handle.events.emit(ExecutorEvent::Paused);
        tracing::info!("queue paused");
        let mut paused = self.handle.control.paused.subscribe();
        let resumed = tokio::select! {
            biased;
            () = abort.requested() => false,
            changed = paused.wait_for(|paused| !*paused) => changed.is_ok(),
        };
        if resumed {
            self.handle.events.emit(ExecutorEvent::Resumed);
            tracing::info!("queue resumed");
        }
    }

    fn finish(&self, state: QueueState) -> QueueState {
        let (completed, total) = {
            let mut queue = lock_queue(&self.handle.queue);
            queue.set_state(state);
            (queue.completed_count(), queue.len())
        };
        if state == QueueState::Aborted {
            self.handle.events.emit(ExecutorEvent::Aborted);
            tracing::warn!(completed, total, "queue aborted");
        } else {
            self.handle.events.emit(ExecutorEvent::Completed);
            tracing::info!(completed, total, "queue completed");
        }
        state
    }

    async fn execute_item(&self, index: usize, abort: &mut AbortSignal) -> ItemFlow {
        let Some((item_id, needs_binding, required, mapping_policy)) = self.with_queue(|queue| {
            let item = queue.item(index)?;
            let details = (
                item.id,
                item.task.needs_binding(),
                item.task.capabilities,
                item.task.device_mapping_failure,
            );
            queue.set_current_item(Some(details.0));
            Some(details)
        }) else {
            return ItemFlow::Next;
        };

        if needs_binding {
            match self.bind_device(required).await {
                Ok(device) => {
                    tracing::info!(item = %item_id, device = %device, "device bound");
                    self.with_item(item_id, |item| item.task.set_device(&device));
                }
                Err(reason) => return self.device_mapping_failed(item_id, mapping_policy, reason),
            }
        }

        let (name, total) = self
            .with_item(item_id, |item| {
                item.task.status = TaskStatus::Running;
                item.sync_from_task();
                (item.task.name.clone(), item.task.actions.len())
            })
            .unwrap_or_default();
        self.handle.events.emit(ExecutorEvent::ItemStarted {
            item_id,
            name: name.clone(),
        });
        tracing::info!(item = %item_id, name = %name, actions = total, "item started");

        for index in 0..total {
            let Some(mut action) = self
                .with_item(item_id, |item| {
                    let slot = item.task.actions.get_mut(index)?;
                    slot.reset_retry();
                    slot.mark_running();
                    let action = slot.clone();
                    item.update_progress(index, action.to_string());
                    Some(action)
                })
                .flatten()
            else {
                break;
            };

            self.handle.events.emit(ExecutorEvent::ActionStarted {
                item_id,
                index,
                action: action.to_string(),
            });
            tracing::info!(item = %item_id, index, action = %action, "action started");

            let events = self.handle.events.clone();
            let progress = move |message: String| {
                events.emit(ExecutorEvent::ActionProgress {
                    item_id,
                    index,
                    message,
                });
            };
            let outcome = self.runner.start(&mut action, abort, &progress).await;

            let error = action.error_message.clone().unwrap_or_default();
            let policy = action.failure_action;
            self.with_item(item_id, |item| {
                if let Some(slot) = item.task.actions.get_mut(index) {
                    *slot = action;
                }
            });

            match outcome {
                ActionOutcome::Completed => {
                    self.handle
                        .events
                        .emit(ExecutorEvent::ActionCompleted { item_id, index });
                }
                ActionOutcome::Aborted => {
                    self.action_failed(item_id, index, &error);
                    self.fail_item(item_id, &error);
                    return ItemFlow::AbortQueue;
                }
                ActionOutcome::Failed => {
                    self.action_failed(item_id, index, &error);
                    match policy {
                        FailureAction::AbortQueue => {
                            self.fail_item(item_id, &error);
                            return ItemFlow::AbortQueue;
                        }
                        FailureAction::Continue => {
                            tracing::warn!(item = %item_id, index, "continuing after failed action");
                            self.handle
                                .events
                                .log(format!("Action {} failed, continuing: {error}", index + 1));
                        }
                        FailureAction::SkipToNextTask => {
                            self.skip_item(item_id, &error);
                            return ItemFlow::Next;
                        }
                    }
                }
            }
        }

        self.complete_item(item_id);
        ItemFlow::Next
    }

    async fn bind_device(&self, required: CapabilityMask) -> Result<String, String> {
        let devices = self
            .runner
            .devices()
            .devices()
            .await
            .map_err(|err| err.to_string())?;
        select_device(&devices, required)
            .map(|device| device.name.clone())
            .ok_or_else(|| format!("No connected device offers capabilities {required}"))
    }

    fn device_mapping_failed(&self, item_id: QueueItemId, policy: FailureAction, reason: String) -> ItemFlow {
        tracing::warn!(item = %item_id, policy = %policy, reason = %reason, "device binding failed");
        match policy {
            FailureAction::SkipToNextTask => {
                self.skip_item(item_id, &reason);
                ItemFlow::Next
            }
            FailureAction::Continue => {
                self.with_item(item_id, |item| item.set_error(reason.clone()));
                self.complete_item(item_id);
                ItemFlow::Next
            }
            FailureAction::AbortQueue => {
                self.fail_item(item_id, &reason);
                ItemFlow::AbortQueue
            }
        }
    }

    fn action_failed(&self, item_id: QueueItemId, index: usize, error: &str) {
        self.handle.events.emit(ExecutorEvent::ActionFailed {
            item_id,
            index,
            error: error.to_string(),
        });
    }

    fn fail_item(&self, item_id: QueueItemId, error: &str) {
        self.with_item(item_id, |item| {
            item.task.fail(error);
            item.sync_from_task();
        });
        self.handle.events.emit(ExecutorEvent::ItemFailed {
            item_id,
            error: error.to_string(),
        });
        tracing::warn!(item = %item_id, error = %error, "item failed");
    }

    fn skip_item(&self, item_id: QueueItemId, reason: &str) {
        self.with_item(item_id, |item| {
            item.set_error(reason);
            item.set_status(QueueItemStatus::Skipped);
        });
        self.handle.events.emit(ExecutorEvent::ItemSkipped {
            item_id,
            reason: reason.to_string(),
        });
        tracing::info!(item = %item_id, reason = %reason, "item skipped");
    }

    fn complete_item(&self, item_id: QueueItemId) {
        let (completed, total) = self.with_queue(|queue| {
            if let Some(item) = queue.item_by_id_mut(item_id) {
                item.task.status = TaskStatus::Completed;
                item.sync_from_task();
            }
            (queue.completed_count(), queue.len())
        });
        self.handle.events.emit(ExecutorEvent::ItemCompleted { item_id });
        self.handle
            .events
            .emit(ExecutorEvent::Progress { completed, total });
        tracing::info!(item = %item_id, completed, total, "item completed");
    }

    fn with_queue<T>(&self, f: impl FnOnce(&mut QueueManager) -> T) -> T {
        f(&mut lock_queue(&self.handle.queue))
    }

    /// Apply `f` to the item if it is still in the queue.
    fn with_item<T>(
        &self,
        item_id: QueueItemId,
        f: impl FnOnce(&mut QueueItem) -> T,
    ) -> Option<T> {
        self.with_queue(|queue| queue.item_by_id_mut(item_id).map(f))
    }
}
