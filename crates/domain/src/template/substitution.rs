//! `${name}` placeholder substitution over JSON trees.
//!
//! Two modes:
//! - a string that is exactly `${name}` becomes the typed parameter value;
//! - a string containing placeholders is rewritten textually, then turned
//!   into a number when the rewrite changed it and the result parses as one.
//!
//! Placeholders naming an absent parameter are left untouched.

use serde_json::{Map, Value};

use crate::value;

/// Return a copy of `definition` with every known placeholder resolved.
#[must_use]
pub fn substitute(definition: &Value, parameters: &Map<String, Value>) -> Value {
    match definition {
        Value::Object(object) => Value::Object(
            object
                .iter()
                .map(|(key, value)| (key.clone(), substitute(value, parameters)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute(item, parameters))
                .collect(),
        ),
        Value::String(text) => substitute_string(text, parameters),
        scalar => scalar.clone(),
    }
}

fn substitute_string(text: &str, parameters: &Map<String, Value>) -> Value {
    if let Some(name) = whole_placeholder(text)
        && let Some(value) = parameters.get(name)
    {
        return value.clone();
    }

    if !text.contains("${") {
        return Value::String(text.to_string());
    }

    let mut result = text.to_string();
    for (name, value) in parameters {
        let placeholder = format!("${{{name}}}");
        if result.contains(&placeholder) {
            let replacement = value::as_text(value).unwrap_or_else(|| value.to_string());
            result = result.replace(&placeholder, &replacement);
        }
    }

    if result != text
        && let Some(number) = value::parse_number(&result)
    {
        return number;
    }
    Value::String(result)
}

fn whole_placeholder(text: &str) -> Option<&str> {
    let name = text.strip_prefix("${")?.strip_suffix('}')?;
    (!name.is_empty() && !name.contains(['{', '}', '$'])).then_some(name)
}

/// `true` when a `${...}` sequence remains anywhere in the tree.
#[must_use]
pub fn has_placeholders(definition: &Value) -> bool {
    match definition {
        Value::Object(object) => object.values().any(has_placeholders),
        Value::Array(items) => items.iter().any(has_placeholders),
        Value::String(text) => text
            .find("${")
            .is_some_and(|start| text[start..].contains('}')),
        _ => false,
    }
}
