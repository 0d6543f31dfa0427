//! Variable template resolution.
//!
//! Substitutes `${name}` placeholders in a step's configuration tree
//! against the run's variable bindings, producing a resolved copy. The
//! authored step is never mutated.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex"));

/// Resolve every placeholder in a step config, recursively.
pub fn resolve_config(config: &Map<String, Value>, variables: &Map<String, Value>) -> Map<String, Value> {
    config
        .iter()
        .map(|(key, value)| (key.clone(), resolve_value(value, variables)))
        .collect()
}

/// Resolve placeholders in a single value. Arrays and objects substitute
/// recursively; non-string leaves pass through unchanged.
pub fn resolve_value(value: &Value, variables: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => resolve_string(s, variables),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_value(item, variables))
                .collect(),
        ),
        Value::Object(map) => Value::Object(resolve_config(map, variables)),
        other => other.clone(),
    }
}

fn resolve_string(template: &str, variables: &Map<String, Value>) -> Value {
    // A string that is exactly one placeholder keeps the bound value's type.
    if let Some(captures) = PLACEHOLDER.captures(template) {
        if captures.get(0).map(|m| m.as_str()) == Some(template) {
            if let Some(bound) = variables.get(&captures[1]) {
                return bound.clone();
            }
        }
    }

    let resolved = PLACEHOLDER.replace_all(template, |captures: &regex::Captures<'_>| {
        match variables.get(&captures[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            // Unknown variable: leave the placeholder verbatim.
            None => captures[0].to_string(),
        }
    });

    Value::String(resolved.into_owned())
}
