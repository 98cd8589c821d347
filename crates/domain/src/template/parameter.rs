use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::value;

/// Declared type of a template parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    #[default]
    Number,
    Text,
    Boolean,
    File,
}

/// One entry of a template's parameter schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParameterType) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            min: None,
            max: None,
            step: None,
            unit: None,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Check one supplied value against this declaration.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint, citing the parameter name.
    pub fn check(&self, value: &Value) -> Result<(), ValidationError> {
        match self.kind {
            ParameterType::Number => {
                let number = value::as_f64(value).ok_or_else(|| ValidationError::NotNumeric {
                    name: self.name.clone(),
                })?;
                if let Some(min) = self.min
                    && number < min
                {
                    return Err(ValidationError::BelowMinimum {
                        name: self.name.clone(),
                        value: number,
                        min,
                    });
                }
                if let Some(max) = self.max
                    && number > max
                {
                    return Err(ValidationError::AboveMaximum {
                        name: self.name.clone(),
                        value: number,
                        max,
                    });
                }
                Ok(())
            }
            ParameterType::Text | ParameterType::File => value::as_text(value)
                .map(|_| ())
                .ok_or_else(|| ValidationError::NotText {
                    name: self.name.clone(),
                }),
            ParameterType::Boolean => value::try_as_bool(value)
                .map(|_| ())
                .ok_or_else(|| ValidationError::NotBoolean {
                    name: self.name.clone(),
                }),
        }
    }
}
