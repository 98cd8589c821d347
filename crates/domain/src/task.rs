//! Task — a concrete, device-bound instance of a template.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::{FailureAction, TaskAction};
use crate::capability::CapabilityMask;
use crate::error::ValidationError;
use crate::template::TaskTemplate;

/// Lifecycle of a task as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Aborted,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        })
    }
}

/// A resolved task: one template, one device, concrete parameters and the
/// ordered actions they produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub template_id: String,
    /// Empty until bound at run time when the template requires capabilities.
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Roles the bound device must offer, copied from the template.
    #[serde(default)]
    pub capabilities: CapabilityMask,
    #[serde(default)]
    pub device_mapping_failure: FailureAction,
    pub actions: Vec<TaskAction>,
}

impl Task {
    /// Resolve `template` against `parameters` and bind it to `device`.
    ///
    /// Nothing is created unless every step succeeds: parameters are
    /// validated first, then each action definition is substituted, bound
    /// to the device and decoded in declaration order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] met: an invalid parameter
    /// (citing its name), an unknown action type, an undecodable action
    /// definition, or a template without actions.
    pub fn from_template(
        template: &TaskTemplate,
        device: &str,
        parameters: Map<String, Value>,
    ) -> Result<Self, ValidationError> {
        template.validate_parameters(&parameters)?;

        let actions = template
            .substituted_actions(&parameters)
            .into_iter()
            .enumerate()
            .map(|(index, mut definition)| {
                if let Value::Object(object) = &mut definition {
                    object.insert("device".to_string(), Value::String(device.to_string()));
                }
                TaskAction::from_definition(index, &definition)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if actions.is_empty() {
            return Err(ValidationError::NoActions);
        }

        Ok(Self {
            name: display_name(&template.name, device),
            template_id: template.id.clone(),
            device: device.to_string(),
            category: template.category.clone(),
            status: TaskStatus::Pending,
            error_message: None,
            parameters,
            capabilities: template.required_capabilities(),
            device_mapping_failure: template.device_mapping_failure,
            actions,
        })
    }

    /// Rebind every action to `device` and refresh the display name suffix.
    pub fn set_device(&mut self, device: &str) {
        let base = if self.device.is_empty() {
            self.name.as_str()
        } else {
            self.name
                .strip_suffix(&format!(" - {}", self.device))
                .unwrap_or(self.name.as_str())
        };
        self.name = display_name(base, device);
        self.device = device.to_string();
        for action in &mut self.actions {
            action.device = device.to_string();
        }
    }

    /// Device left empty on purpose, to be bound when the task runs.
    #[must_use]
    pub fn needs_binding(&self) -> bool {
        self.device.is_empty() && !self.capabilities.is_empty()
    }

    /// The task targets a device, either explicitly or through binding.
    #[must_use]
    pub fn requires_device(&self) -> bool {
        !self.device.is_empty() || !self.capabilities.is_empty()
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.error_message = Some(message.into());
    }
}

fn display_name(template_name: &str, device: &str) -> String {
    if device.is_empty() {
        template_name.to_string()
    } else {
        format!("{template_name} - {device}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::action::{ActionKind, ActionType};
    use crate::template::{Parameter, ParameterType, has_placeholders};

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn capture_template() -> TaskTemplate {
        TaskTemplate::builder()
            .id("capture")
            .name("Capture Frame")
            .category("Camera")
            .capability(CapabilityMask::CCD)
            .parameter(
                Parameter::new("exposure", ParameterType::Number).with_range(Some(0.001), Some(3600.0)),
            )
            .parameter(Parameter::new("script_dir", ParameterType::File))
            .action(json!({
                "type": "SET",
                "property": "CCD_EXPOSURE",
                "element": "CCD_EXPOSURE_VALUE",
                "value": "${exposure}",
                "timeout": "${exposure}0"
            }))
            .action(json!({"type": "DELAY", "duration": "${exposure}"}))
            .action(json!({"type": "SCRIPT", "path": "${script_dir}/after.sh", "arguments": ["${exposure}"]}))
            .build()
            .unwrap()
    }

    #[test]
    fn should_instantiate_actions_in_declared_order() {
        let task = Task::from_template(
            &capture_template(),
            "CCD Simulator",
            params(json!({"exposure": 3, "script_dir": "/opt"})),
        )
        .unwrap();

        assert_eq!(task.name, "Capture Frame - CCD Simulator");
        assert_eq!(task.template_id, "capture");
        assert_eq!(task.category, "Camera");
        assert_eq!(task.capabilities, CapabilityMask::CCD);
        let types: Vec<ActionType> = task.actions.iter().map(TaskAction::action_type).collect();
        assert_eq!(types, vec![ActionType::Set, ActionType::Delay, ActionType::Script]);
        assert!(task.actions.iter().all(|a| a.device == "CCD Simulator"));
        assert_eq!(task.actions[0].timeout_secs, 30);
    }

    #[test]
    fn should_leave_no_placeholders_when_parameters_are_complete() {
        let task = Task::from_template(
            &capture_template(),
            "CCD Simulator",
            params(json!({"exposure": 4, "script_dir": "/opt"})),
        )
        .unwrap();
        let serialized = serde_json::to_value(&task.actions).unwrap();
        assert!(!has_placeholders(&serialized));
        let ActionKind::Script(script) = &task.actions[2].kind else {
            panic!("expected a script action");
        };
        assert_eq!(script.path.to_str(), Some("/opt/after.sh"));
        assert_eq!(script.arguments, vec!["4"]);
    }

    #[test]
    fn should_fail_citing_exposure_when_parameters_are_empty() {
        let err = Task::from_template(&capture_template(), "CCD Simulator", Map::new()).unwrap_err();
        assert!(err.to_string().contains("exposure"));
    }

    #[test]
    fn should_fail_whole_instantiation_when_one_action_is_invalid() {
        let template = TaskTemplate::builder()
            .id("broken")
            .name("Broken")
            .category("Misc")
            .action(json!({"type": "DELAY", "duration": 1}))
            .action(json!({"type": "WARP"}))
            .build()
            .unwrap();
        let err = Task::from_template(&template, "Any", Map::new()).unwrap_err();
        assert_eq!(err, ValidationError::UnknownActionType("WARP".to_string()));
    }

    #[test]
    fn should_rebind_every_action_and_rename_when_device_changes() {
        let mut task = Task::from_template(
            &capture_template(),
            "",
            params(json!({"exposure": 1, "script_dir": "/opt"})),
        )
        .unwrap();
        assert_eq!(task.name, "Capture Frame");
        assert!(task.needs_binding());

        task.set_device("CCD Simulator");
        assert_eq!(task.name, "Capture Frame - CCD Simulator");
        assert!(task.actions.iter().all(|a| a.device == "CCD Simulator"));

        task.set_device("Guide Camera");
        assert_eq!(task.name, "Capture Frame - Guide Camera");
        assert!(!task.needs_binding());
    }
}
