//! Collection files — flat recipes used to populate a fresh queue.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One task to instantiate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub template_id: String,
    /// Empty means "bind at run time".
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tasks: Vec<CollectionEntry>,
}

/// Outcome of populating a queue from a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub added: usize,
    pub failed: usize,
    pub warnings: Vec<String>,
}

impl CollectionReport {
    pub fn warn(&mut self, message: impl Into<String>) {
        self.failed += 1;
        self.warnings.push(message.into());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_default_device_to_dynamic_binding() {
        let collection: Collection = serde_json::from_value(json!({
            "name": "Evening",
            "tasks": [
                {"template_id": "ccd_cool", "parameters": {"temperature": -10}},
                {"template_id": "park", "device": "Telescope Simulator"}
            ]
        }))
        .unwrap();
        assert_eq!(collection.tasks.len(), 2);
        assert!(collection.tasks[0].device.is_empty());
        assert!(collection.tasks[1].parameters.is_empty());
        assert!(collection.description.is_empty());
    }

    #[test]
    fn should_count_failures_with_warnings() {
        let mut report = CollectionReport::default();
        report.warn("unknown template: x");
        assert_eq!(report.failed, 1);
        assert_eq!(report.warnings, vec!["unknown template: x"]);
    }
}
