//! Time and timestamp helpers.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// UTC timestamp used for queue item bookkeeping and scheduled starts.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Time left until `target`, or `None` once it has passed.
#[must_use]
pub fn remaining_until(target: Timestamp, reference: Timestamp) -> Option<Duration> {
    (target - reference).to_std().ok().filter(|d| !d.is_zero())
}

/// Render a duration as `1h 02m 03s`, dropping leading zero units.
#[must_use]
pub fn format_remaining(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}
