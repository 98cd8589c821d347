//! Waiting on a device property: poll ticks, change notifications and a
//! deadline, whichever comes first.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};

use taskqueue_domain::property::PropertyUpdate;

/// The deadline passed before anything else happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct TimedOut;

pub(super) struct PropertyWatch {
    updates: Option<broadcast::Receiver<PropertyUpdate>>,
    device: String,
    property: String,
    ticker: Interval,
    deadline: Instant,
}

impl PropertyWatch {
    pub(super) fn new(
        updates: broadcast::Receiver<PropertyUpdate>,
        device: &str,
        property: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        let now = Instant::now();
        let mut ticker = interval_at(now + poll_interval, poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            updates: Some(updates),
            device: device.to_string(),
            property: property.to_string(),
            ticker,
            deadline: now + timeout,
        }
    }

    /// Resolve when the property should be checked again.
    pub(super) async fn wait(&mut self) -> Result<(), TimedOut> {
        tokio::select! {
            biased;
            () = sleep_until(self.deadline) => Err(TimedOut),
            () = next_update(&mut self.updates, &self.device, &self.property) => Ok(()),
            _ = self.ticker.tick() => Ok(()),
        }
    }
}

async fn next_update(
    updates: &mut Option<broadcast::Receiver<PropertyUpdate>>,
    device: &str,
    property: &str,
) {
    loop {
        let Some(receiver) = updates.as_mut() else {
            return std::future::pending().await;
        };
        match receiver.recv().await {
            Ok(update) if update.concerns(device, property) => return,
            Ok(_) => {}
            // Missed notifications may include ours.
            Err(RecvError::Lagged(_)) => return,
            Err(RecvError::Closed) => *updates = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(device: &str, property: &str) -> PropertyUpdate {
        PropertyUpdate {
            device: device.to_string(),
            property: property.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_wake_on_matching_update_before_poll_tick() {
        let (sender, receiver) = broadcast::channel(8);
        let mut watch = PropertyWatch::new(
            receiver,
            "Focuser Simulator",
            "ABS_FOCUS_POSITION",
            Duration::from_secs(10),
            Duration::from_secs(60),
        );
        let started = Instant::now();
        sender.send(update("Focuser Simulator", "OTHER")).unwrap();
        sender.send(update("Focuser Simulator", "ABS_FOCUS_POSITION")).unwrap();

        assert_eq!(watch.wait().await, Ok(()));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn should_wake_on_poll_tick_without_updates() {
        let (_sender, receiver) = broadcast::channel(8);
        let mut watch = PropertyWatch::new(
            receiver,
            "CCD Simulator",
            "CCD_TEMPERATURE",
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
        let started = Instant::now();

        assert_eq!(watch.wait().await, Ok(()));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn should_time_out_at_deadline_even_after_publisher_is_gone() {
        let (sender, receiver) = broadcast::channel(8);
        drop(sender);
        let mut watch = PropertyWatch::new(
            receiver,
            "CCD Simulator",
            "CCD_TEMPERATURE",
            Duration::from_secs(10),
            Duration::from_secs(3),
        );

        assert_eq!(watch.wait().await, Err(TimedOut));
    }
}
