use tokio::time::sleep;

use taskqueue_domain::action::{DelayAction, StartAction};
use taskqueue_domain::time::{self, format_remaining};

use super::{ActionRunner, ProgressSink};
use crate::ports::{DeviceAccess, ProcessRunner};

impl<D, R> ActionRunner<D, R>
where
    D: DeviceAccess,
    R: ProcessRunner,
{
    pub(super) async fn run_delay(&self, delay: &DelayAction, progress: &ProgressSink) {
        let duration = delay.as_duration();
        progress(format!("Waiting {}", format_remaining(duration)));
        sleep(duration).await;
    }

    /// Hold until the scheduled time, announcing what is left periodically.
    pub(super) async fn run_start(&self, start: &StartAction, progress: &ProgressSink) {
        while let Some(remaining) = start.remaining(time::now()) {
            progress(format!("Starting in {}", format_remaining(remaining)));
            sleep(remaining.min(self.settings.schedule_progress_interval)).await;
        }
    }
}
