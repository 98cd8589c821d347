//! Device properties as seen through the property-access port.
//!
//! A property is a named group of elements sharing one settle state. Writes
//! target a single element; the device reports progress through the state
//! (`Busy` while moving, `Ok` once settled, `Alert` on failure).

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of values a property carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Number,
    Text,
    Switch,
    Light,
}

/// Settle state of a property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyState {
    #[default]
    Idle,
    Ok,
    Busy,
    Alert,
}

impl PropertyState {
    /// The state is terminal-good: the last write settled.
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Ok | Self::Idle)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Ok => "OK",
            Self::Busy => "Busy",
            Self::Alert => "Alert",
        }
    }
}

impl fmt::Display for PropertyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How sibling switch elements react when one of them is turned on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchRule {
    /// Exactly one element is on at any time.
    #[default]
    OneOfMany,
    AtMostOne,
    AnyOfMany,
}

/// Value held by one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ElementValue {
    Number(f64),
    Text(String),
    Switch(bool),
    Light(PropertyState),
}

impl ElementValue {
    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Number(_) => PropertyKind::Number,
            Self::Text(_) => PropertyKind::Text,
            Self::Switch(_) => PropertyKind::Switch,
            Self::Light(_) => PropertyKind::Light,
        }
    }
}

impl fmt::Display for ElementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Switch(true) => f.write_str("On"),
            Self::Switch(false) => f.write_str("Off"),
            Self::Light(state) => state.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub value: ElementValue,
}

/// Snapshot of a device property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
    pub state: PropertyState,
    #[serde(default)]
    pub rule: SwitchRule,
    pub elements: Vec<Element>,
}

impl Property {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            state: PropertyState::Idle,
            rule: SwitchRule::default(),
            elements: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_element(mut self, name: impl Into<String>, value: ElementValue) -> Self {
        self.elements.push(Element {
            name: name.into(),
            value,
        });
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: SwitchRule) -> Self {
        self.rule = rule;
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: PropertyState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn element_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.name == name)
    }
}

/// Notification that a device property changed (value or state).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyUpdate {
    pub device: String,
    pub property: String,
}

impl PropertyUpdate {
    #[must_use]
    pub fn concerns(&self, device: &str, property: &str) -> bool {
        self.device == device && self.property == property
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_find_element_by_name() {
        let property = Property::new("CCD_TEMPERATURE", PropertyKind::Number)
            .with_element("CCD_TEMPERATURE_VALUE", ElementValue::Number(-10.0));
        let element = property.element("CCD_TEMPERATURE_VALUE").unwrap();
        assert_eq!(element.value, ElementValue::Number(-10.0));
        assert!(property.element("MISSING").is_none());
    }

    #[test]
    fn should_treat_ok_and_idle_as_settled() {
        assert!(PropertyState::Ok.is_settled());
        assert!(PropertyState::Idle.is_settled());
        assert!(!PropertyState::Busy.is_settled());
        assert!(!PropertyState::Alert.is_settled());
    }

    #[test]
    fn should_render_state_names() {
        assert_eq!(PropertyState::Ok.to_string(), "OK");
        assert_eq!(PropertyState::Idle.to_string(), "Idle");
    }

    #[test]
    fn should_match_update_on_device_and_property() {
        let update = PropertyUpdate {
            device: "CCD Simulator".to_string(),
            property: "CCD_TEMPERATURE".to_string(),
        };
        assert!(update.concerns("CCD Simulator", "CCD_TEMPERATURE"));
        assert!(!update.concerns("CCD Simulator", "CCD_COOLER"));
    }
}
