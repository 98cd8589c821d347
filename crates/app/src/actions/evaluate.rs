use taskqueue_domain::action::{EvaluateAction, TaskAction};
use taskqueue_domain::error::DeviceError;

use super::watch::PropertyWatch;
use super::{ActionError, ActionRunner, ProgressSink};
use crate::ports::{DeviceAccess, ProcessRunner};

impl<D, R> ActionRunner<D, R>
where
    D: DeviceAccess,
    R: ProcessRunner,
{
    /// Wait until the condition holds on the property.
    ///
    /// A read that fails while waiting is not fatal; only the deadline is.
    pub(super) async fn run_evaluate(
        &self,
        action: &TaskAction,
        evaluate: &EvaluateAction,
        progress: &ProgressSink,
    ) -> Result<(), ActionError> {
        let device = self.devices.device(&action.device).await?;
        if !device.connected {
            return Err(DeviceError::NotConnected(device.name).into());
        }

        let mut watch = PropertyWatch::new(
            self.devices.subscribe(),
            &action.device,
            &action.property,
            self.settings.poll_interval,
            action.timeout(),
        );
        progress(format!("Evaluating {} {evaluate}", action.target()));
        loop {
            match self.devices.property(&action.device, &action.property).await {
                Ok(property) => {
                    if evaluate
                        .reading(&property)
                        .is_some_and(|reading| evaluate.holds(&reading))
                    {
                        return Ok(());
                    }
                }
                Err(err) => tracing::debug!(action = %action, error = %err, "read failed, waiting"),
            }
            watch.wait().await.map_err(|_| ActionError::EvaluationTimeout {
                property: action.property.clone(),
                element: evaluate.element.clone(),
            })?;
        }
    }
}
