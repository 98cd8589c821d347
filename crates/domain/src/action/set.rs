use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::property::{ElementValue, PropertyKind};
use crate::value;

const NUMBER_TOLERANCE: f64 = 0.01;

fn default_wait() -> bool {
    true
}

/// Write a value to a property element, optionally waiting for it to settle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetAction {
    pub element: String,
    pub value: Value,
    #[serde(default = "default_wait")]
    pub wait_for_completion: bool,
}

impl SetAction {
    #[must_use]
    pub fn new(element: impl Into<String>, value: Value) -> Self {
        Self {
            element: element.into(),
            value,
            wait_for_completion: true,
        }
    }

    /// The target converted to what a property of `kind` accepts.
    ///
    /// Lights are read-only and have no writable form.
    #[must_use]
    pub fn target_for(&self, kind: PropertyKind) -> Option<ElementValue> {
        match kind {
            PropertyKind::Number => value::as_f64(&self.value).map(ElementValue::Number),
            PropertyKind::Text => value::as_text(&self.value).map(ElementValue::Text),
            PropertyKind::Switch => Some(ElementValue::Switch(value::as_bool(&self.value))),
            PropertyKind::Light => None,
        }
    }

    /// `true` when `current` already equals the target.
    #[must_use]
    pub fn is_satisfied_by(&self, current: &ElementValue) -> bool {
        match current {
            ElementValue::Number(n) => {
                value::as_f64(&self.value).is_some_and(|target| (n - target).abs() < NUMBER_TOLERANCE)
            }
            ElementValue::Text(text) => value::as_text(&self.value).is_some_and(|target| *text == target),
            ElementValue::Switch(on) => value::as_bool(&self.value) == *on,
            ElementValue::Light(_) => false,
        }
    }
}
