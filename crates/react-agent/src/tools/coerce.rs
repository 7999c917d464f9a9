//! Coercion of model-supplied string arguments to declared types

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::{ArgumentType, ToolArgument};

/// Name of the single-input shorthand argument
pub const INPUT_ARGUMENT: &str = "input";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("missing required argument '{0}'")]
    Missing(String),

    #[error("unexpected argument '{0}'")]
    Unexpected(String),

    #[error("argument '{name}' expects {expected}, got '{value}'")]
    InvalidValue {
        name: String,
        expected: ArgumentType,
        value: String,
    },
}

/// Coerce raw arguments against a tool's declaration.
///
/// Names match case-insensitively. Defaults fill in absent values. An `input`
/// argument the tool does not declare is mapped onto its only required
/// argument (or its only argument) unless that one was given explicitly.
pub fn coerce_arguments(
    declared: &[ToolArgument],
    raw: &BTreeMap<String, String>,
) -> Result<Value, ArgumentError> {
    let mut provided: BTreeMap<&str, &str> = BTreeMap::new();
    let mut input = None;

    for (name, value) in raw {
        match declared.iter().find(|arg| arg.name.eq_ignore_ascii_case(name)) {
            Some(arg) => {
                provided.insert(arg.name.as_str(), value.as_str());
            }
            None if name.eq_ignore_ascii_case(INPUT_ARGUMENT) => input = Some(value.as_str()),
            None => return Err(ArgumentError::Unexpected(name.clone())),
        }
    }

    if let Some(value) = input {
        let target = input_target(declared).ok_or_else(|| ArgumentError::Unexpected(INPUT_ARGUMENT.to_string()))?;
        provided.entry(target.name.as_str()).or_insert(value);
    }

    let mut out = Map::new();
    for arg in declared {
        let value = match provided.get(arg.name.as_str()).copied().or(arg.default.as_deref()) {
            Some(value) => value,
            None if arg.required => return Err(ArgumentError::Missing(arg.name.clone())),
            None => continue,
        };
        out.insert(arg.name.clone(), coerce_value(arg, value)?);
    }

    Ok(Value::Object(out))
}

fn input_target(declared: &[ToolArgument]) -> Option<&ToolArgument> {
    if let [only] = declared {
        return Some(only);
    }
    let mut required = declared.iter().filter(|arg| arg.required);
    match (required.next(), required.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// Coerce one value. A bool is true iff its lowercase form is `"true"`.
pub fn coerce_value(arg: &ToolArgument, value: &str) -> Result<Value, ArgumentError> {
    let invalid = || ArgumentError::InvalidValue {
        name: arg.name.clone(),
        expected: arg.arg_type,
        value: value.to_string(),
    };

    match arg.arg_type {
        ArgumentType::String => Ok(Value::String(value.to_string())),
        ArgumentType::Int => value
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid()),
        ArgumentType::Float => value
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        ArgumentType::Bool => Ok(Value::Bool(value.trim().to_lowercase() == "true")),
    }
}
