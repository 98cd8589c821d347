//! Task templates — reusable, parameterized blueprints for tasks.
//!
//! A template declares a parameter schema and a list of action definitions
//! written as JSON with `${parameter}` placeholders. Templates are loaded
//! from definition files and never change afterwards; user templates are
//! derived from system ones by overriding parameter defaults.

mod parameter;
mod substitution;

pub use parameter::{Parameter, ParameterType};
pub use substitution::{has_placeholders, substitute};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::FailureAction;
use crate::capability::CapabilityMask;
use crate::error::{TaskQueueError, ValidationError};

fn default_version() -> String {
    "1.0".to_string()
}

/// Immutable blueprint describing a parameterized sequence of actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(
        rename = "parent_template",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<String>,
    /// Set by the loader, never read from or written to files.
    #[serde(skip)]
    pub system: bool,
    #[serde(rename = "supported_interfaces", default)]
    pub capabilities: Vec<CapabilityMask>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "device_mapping_failure_action", default)]
    pub device_mapping_failure: FailureAction,
    pub actions: Vec<Value>,
}

impl TaskTemplate {
    #[must_use]
    pub fn builder() -> TaskTemplateBuilder {
        TaskTemplateBuilder::default()
    }

    /// Parse a single template object.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Serialization`] for malformed JSON and
    /// [`TaskQueueError::Validation`] when invariants do not hold.
    pub fn from_json(value: Value) -> Result<Self, TaskQueueError> {
        let template: Self = serde_json::from_value(value)?;
        template.validate()?;
        Ok(template)
    }

    /// Check the template invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when `id`, `name` or `category` is empty,
    /// when there are no actions, or when an action definition is not an object.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        if self.actions.is_empty() {
            return Err(ValidationError::NoActions);
        }
        if let Some(index) = self.actions.iter().position(|a| !a.is_object()) {
            return Err(ValidationError::InvalidAction {
                index,
                reason: "definition must be an object".to_string(),
            });
        }
        Ok(())
    }

    /// Validate supplied values against every declared parameter.
    ///
    /// # Errors
    ///
    /// Fails fast with the first violated constraint.
    pub fn validate_parameters(&self, values: &Map<String, Value>) -> Result<(), ValidationError> {
        for parameter in &self.parameters {
            let value = values
                .get(&parameter.name)
                .ok_or_else(|| ValidationError::MissingParameter(parameter.name.clone()))?;
            parameter.check(value)?;
        }
        Ok(())
    }

    /// Action definitions with every known placeholder resolved.
    #[must_use]
    pub fn substituted_actions(&self, values: &Map<String, Value>) -> Vec<Value> {
        self.actions
            .iter()
            .map(|definition| substitute(definition, values))
            .collect()
    }

    /// Declared defaults overlaid with `overrides`.
    #[must_use]
    pub fn parameters_with_defaults(&self, overrides: &Map<String, Value>) -> Map<String, Value> {
        let mut values: Map<String, Value> = self
            .parameters
            .iter()
            .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
            .collect();
        for (name, value) in overrides {
            values.insert(name.clone(), value.clone());
        }
        values
    }

    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Union of every declared capability.
    #[must_use]
    pub fn required_capabilities(&self) -> CapabilityMask {
        self.capabilities.iter().copied().collect()
    }

    /// Any declared capability intersects the device's bits.
    #[must_use]
    pub fn supports_device(&self, device: CapabilityMask) -> bool {
        self.capabilities.iter().any(|c| c.intersects(device))
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        self.system
    }
}

/// Split a template file into its template objects.
///
/// A file holds either a single template object or `{"templates": [...]}`.
/// Each entry is parsed independently so one bad entry does not hide the rest.
#[must_use]
pub fn parse_document(document: Value) -> Vec<Result<TaskTemplate, TaskQueueError>> {
    match document {
        Value::Object(mut root) => match root.remove("templates") {
            Some(Value::Array(entries)) => entries.into_iter().map(TaskTemplate::from_json).collect(),
            Some(other) => vec![Err(ValidationError::InvalidTemplate(format!(
                "`templates` must be an array, got {other}"
            ))
            .into())],
            None => vec![TaskTemplate::from_json(Value::Object(root))],
        },
        other => vec![Err(ValidationError::InvalidTemplate(format!(
            "expected an object, got {other}"
        ))
        .into())],
    }
}

/// Step-by-step builder for [`TaskTemplate`].
#[derive(Debug, Default)]
pub struct TaskTemplateBuilder {
    id: Option<String>,
    name: Option<String>,
    description: String,
    category: Option<String>,
    version: Option<String>,
    parent_id: Option<String>,
    system: bool,
    capabilities: Vec<CapabilityMask>,
    parameters: Vec<Parameter>,
    device_mapping_failure: FailureAction,
    actions: Vec<Value>,
}

impl TaskTemplateBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    #[must_use]
    pub fn system(mut self, system: bool) -> Self {
        self.system = system;
        self
    }

    #[must_use]
    pub fn capability(mut self, capability: CapabilityMask) -> Self {
        self.capabilities.push(capability);
        self
    }

    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn device_mapping_failure(mut self, policy: FailureAction) -> Self {
        self.device_mapping_failure = policy;
        self
    }

    #[must_use]
    pub fn action(mut self, definition: Value) -> Self {
        self.actions.push(definition);
        self
    }

    /// Consume the builder, validate, and return a [`TaskTemplate`].
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Validation`] if required fields are missing or empty.
    pub fn build(self) -> Result<TaskTemplate, TaskQueueError> {
        let template = TaskTemplate {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description,
            category: self.category.unwrap_or_default(),
            version: self.version.unwrap_or_else(default_version),
            parent_id: self.parent_id,
            system: self.system,
            capabilities: self.capabilities,
            parameters: self.parameters,
            device_mapping_failure: self.device_mapping_failure,
            actions: self.actions,
        };
        template.validate()?;
        Ok(template)
    }
}
