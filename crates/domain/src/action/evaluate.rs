use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::property::{ElementValue, Property, PropertyState};
use crate::value;

const NUMBER_EPSILON: f64 = 0.001;

/// Wait until a property satisfies a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateAction {
    #[serde(default)]
    pub element: String,
    pub property_type: PropertyType,
    pub condition: Condition,
    pub target: Value,
    #[serde(default, deserialize_with = "crate::value::lenient::f64")]
    pub margin: f64,
    /// Accept an `Idle` state as done when a preceding step was skipped.
    #[serde(default)]
    pub accept_idle_on_skipped_predecessor: bool,
}

impl EvaluateAction {
    #[must_use]
    pub fn new(
        element: impl Into<String>,
        property_type: PropertyType,
        condition: Condition,
        target: Value,
    ) -> Self {
        Self {
            element: element.into(),
            property_type,
            condition,
            target,
            margin: 0.0,
            accept_idle_on_skipped_predecessor: false,
        }
    }

    /// Extract the value this evaluation looks at from a property snapshot.
    #[must_use]
    pub fn reading(&self, property: &Property) -> Option<Reading> {
        if self.property_type == PropertyType::State {
            return Some(Reading::State(property.state));
        }
        let element = property.element(&self.element)?;
        match (self.property_type, &element.value) {
            (PropertyType::Number, ElementValue::Number(n)) => Some(Reading::Number(*n)),
            (PropertyType::Text, ElementValue::Text(t)) => Some(Reading::Text(t.clone())),
            (PropertyType::Switch, ElementValue::Switch(on)) => Some(Reading::Bool(*on)),
            (PropertyType::Light, ElementValue::Light(state)) => Some(Reading::Bool(matches!(
                state,
                PropertyState::Ok | PropertyState::Busy
            ))),
            _ => None,
        }
    }

    /// `true` when the condition holds for `reading`.
    ///
    /// Unsupported condition/type combinations never hold.
    #[must_use]
    pub fn holds(&self, reading: &Reading) -> bool {
        match reading {
            Reading::Number(current) => value::as_f64(&self.target)
                .is_some_and(|target| self.compare_number(*current, target)),
            Reading::Text(current) => value::as_text(&self.target)
                .is_some_and(|target| self.compare_text(current, &target)),
            Reading::Bool(current) => {
                let target = value::as_bool(&self.target);
                match self.condition {
                    Condition::Equals => *current == target,
                    Condition::NotEquals => *current != target,
                    _ => false,
                }
            }
            Reading::State(state) => {
                let target = value::as_text(&self.target).unwrap_or_default();
                let same = state.as_str().eq_ignore_ascii_case(target.trim());
                match self.condition {
                    Condition::Equals => same,
                    Condition::NotEquals => !same,
                    _ => false,
                }
            }
        }
    }

    /// Shortcut used before arming the wait.
    #[must_use]
    pub fn is_already_done(&self, property: &Property) -> bool {
        if self.property_type == PropertyType::State
            && self.accept_idle_on_skipped_predecessor
            && property.state == PropertyState::Idle
        {
            return true;
        }
        self.reading(property).is_some_and(|r| self.holds(&r))
    }

    fn compare_number(&self, current: f64, target: f64) -> bool {
        let delta = (current - target).abs();
        match self.condition {
            Condition::Equals => delta < NUMBER_EPSILON,
            Condition::NotEquals => delta >= NUMBER_EPSILON,
            Condition::GreaterThan => current > target,
            Condition::LessThan => current < target,
            Condition::GreaterEqual => current >= target,
            Condition::LessEqual => current <= target,
            Condition::WithinRange => delta <= self.margin,
            Condition::Contains | Condition::StartsWith => false,
        }
    }

    fn compare_text(&self, current: &str, target: &str) -> bool {
        match self.condition {
            Condition::Equals => current == target,
            Condition::NotEquals => current != target,
            Condition::Contains => current.to_lowercase().contains(&target.to_lowercase()),
            Condition::StartsWith => current.to_lowercase().starts_with(&target.to_lowercase()),
            _ => false,
        }
    }
}

impl fmt::Display for EvaluateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.condition.describe(), self.target)?;
        if self.condition == Condition::WithinRange {
            write!(f, " ± {}", self.margin)?;
        }
        Ok(())
    }
}

/// What an evaluation compares against.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Number(f64),
    Text(String),
    Bool(bool),
    State(PropertyState),
}

macro_rules! ordinal_enum {
    ($(#[doc = $doc:expr])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }

            #[must_use]
            pub fn from_ordinal(ordinal: u64) -> Option<Self> {
                usize::try_from(ordinal).ok().and_then(|i| Self::ALL.get(i).copied())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| format!("unknown {}: {s}", stringify!($name)))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                match OrdinalOrName::deserialize(deserializer)? {
                    OrdinalOrName::Ordinal(ordinal) => Self::from_ordinal(ordinal).ok_or_else(|| {
                        D::Error::custom(format!("{} out of range: {ordinal}", stringify!($name)))
                    }),
                    OrdinalOrName::Name(name) => name.parse().map_err(D::Error::custom),
                }
            }
        }
    };
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrdinalOrName {
    Ordinal(u64),
    Name(String),
}

ordinal_enum!(
    /// How the property is read.
    PropertyType {
        Number => "NUMBER",
        Text => "TEXT",
        Switch => "SWITCH",
        Light => "LIGHT",
        State => "STATE",
    }
);

ordinal_enum!(
    /// Comparison applied between the reading and the target.
    Condition {
        Equals => "EQUALS",
        NotEquals => "NOT_EQUALS",
        GreaterThan => "GREATER_THAN",
        LessThan => "LESS_THAN",
        GreaterEqual => "GREATER_EQUAL",
        LessEqual => "LESS_EQUAL",
        WithinRange => "WITHIN_RANGE",
        Contains => "CONTAINS",
        StartsWith => "STARTS_WITH",
    }
);

impl Condition {
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not equals",
            Self::GreaterThan => "greater than",
            Self::LessThan => "less than",
            Self::GreaterEqual => "greater or equal",
            Self::LessEqual => "less or equal",
            Self::WithinRange => "within range of",
            Self::Contains => "contains",
            Self::StartsWith => "starts with",
        }
    }
}
