use taskqueue_domain::action::{SetAction, TaskAction};
use taskqueue_domain::error::DeviceError;
use taskqueue_domain::property::PropertyState;

use super::watch::PropertyWatch;
use super::{ActionError, ActionRunner, ProgressSink};
use crate::ports::{DeviceAccess, ProcessRunner};

impl<D, R> ActionRunner<D, R>
where
    D: DeviceAccess,
    R: ProcessRunner,
{
    /// Write the target, then wait for the property to settle on it.
    pub(super) async fn run_set(
        &self,
        action: &TaskAction,
        set: &SetAction,
        progress: &ProgressSink,
    ) -> Result<(), ActionError> {
        let property = self.devices.property(&action.device, &action.property).await?;
        if property.element(&set.element).is_none() {
            return Err(DeviceError::ElementNotFound {
                property: action.property.clone(),
                element: set.element.clone(),
            }
            .into());
        }
        let target = set
            .target_for(property.kind)
            .ok_or_else(|| DeviceError::UnsupportedProperty(action.property.clone()))?;

        // Subscribe before writing so the settle notification cannot be missed.
        let updates = self.devices.subscribe();
        progress(format!("Setting {} to {target}", action.target()));
        self.devices
            .write(&action.device, &action.property, &set.element, target)
            .await?;
        if !set.wait_for_completion {
            return Ok(());
        }

        let mut watch = PropertyWatch::new(
            updates,
            &action.device,
            &action.property,
            self.settings.poll_interval,
            action.timeout(),
        );
        loop {
            let property = self.devices.property(&action.device, &action.property).await?;
            match property.state {
                PropertyState::Alert => {
                    return Err(ActionError::Alert {
                        target: action.target(),
                    });
                }
                PropertyState::Busy => {}
                PropertyState::Ok | PropertyState::Idle => {
                    let reached = property
                        .element(&set.element)
                        .is_some_and(|element| set.is_satisfied_by(&element.value));
                    if reached {
                        progress(format!("{} confirmed", action.target()));
                        return Ok(());
                    }
                }
            }
            watch.wait().await.map_err(|_| ActionError::SettleTimeout {
                target: action.target(),
            })?;
        }
    }
}
