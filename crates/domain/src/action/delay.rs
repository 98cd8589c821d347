use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Unit of a [`DelayAction`] duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DelayUnit {
    #[default]
    Seconds,
    Minutes,
    Hours,
}

impl DelayUnit {
    #[must_use]
    pub fn seconds(self) -> u64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3600,
        }
    }
}

/// Pure timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayAction {
    #[serde(deserialize_with = "crate::value::lenient::u64")]
    pub duration: u64,
    #[serde(default)]
    pub unit: DelayUnit,
}

impl DelayAction {
    #[must_use]
    pub fn new(duration: u64, unit: DelayUnit) -> Self {
        Self { duration, unit }
    }

    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.duration.saturating_mul(self.unit.seconds()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_units_to_seconds() {
        assert_eq!(
            DelayAction::new(2, DelayUnit::Minutes).as_duration(),
            Duration::from_secs(120)
        );
        assert_eq!(
            DelayAction::new(1, DelayUnit::Hours).as_duration(),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn should_default_unit_to_seconds() {
        let action: DelayAction = serde_json::from_value(serde_json::json!({"duration": 5})).unwrap();
        assert_eq!(action.unit, DelayUnit::Seconds);
    }
}
