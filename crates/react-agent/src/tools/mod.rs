//! Tool framework for the agent loop
//!
//! Tools declare typed arguments; the model supplies them as strings, which are
//! coerced (see [`coerce`]) before [`Tool::execute`] sees them.

pub mod builtin;
pub mod coerce;
pub mod registry;
pub mod router;
pub mod security;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Declared type of a tool argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentType {
    String,
    Int,
    Float,
    Bool,
}

impl fmt::Display for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentType::String => write!(f, "string"),
            ArgumentType::Int => write!(f, "int"),
            ArgumentType::Float => write!(f, "float"),
            ArgumentType::Bool => write!(f, "bool"),
        }
    }
}

/// A named, typed tool argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolArgument {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: ArgumentType,
    pub description: String,
    pub required: bool,
    /// Raw default, coerced like a model-supplied value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ToolArgument {
    fn new(name: impl Into<String>, arg_type: ArgumentType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arg_type,
            description: description.into(),
            required: true,
            default: None,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ArgumentType::String, description)
    }

    pub fn int(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ArgumentType::Int, description)
    }

    pub fn float(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ArgumentType::Float, description)
    }

    pub fn bool(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ArgumentType::Bool, description)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set a default; an argument with a default is never required
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }
}

/// Context provided to tools during execution
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Current working directory
    pub working_dir: PathBuf,
    /// Skip approval for tools that need validation
    pub auto_approve: bool,
    /// Maximum output length (truncate if exceeded)
    pub max_output_len: usize,
    /// Default timeout for shell commands in seconds
    pub command_timeout_secs: u64,
    /// How long to wait for an approval answer; `None` waits indefinitely
    pub approval_timeout: Option<Duration>,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            auto_approve: false,
            max_output_len: 50000,
            command_timeout_secs: 120,
            approval_timeout: None,
        }
    }
}

impl ToolContext {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            ..Default::default()
        }
    }

    pub fn with_auto_approve(mut self, auto: bool) -> Self {
        self.auto_approve = auto;
        self
    }

    pub fn with_command_timeout(mut self, secs: u64) -> Self {
        self.command_timeout_secs = secs;
        self
    }

    pub fn with_approval_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.approval_timeout = timeout;
        self
    }

    /// Resolve a path relative to the working directory
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.working_dir.join(path)
        }
    }

    /// Truncate output to `max_output_len` on a char boundary
    pub fn truncate(&self, output: String) -> String {
        if output.len() <= self.max_output_len {
            return output;
        }
        let mut end = self.max_output_len;
        while !output.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}\n\n[Output truncated at {} characters]", &output[..end], end)
    }
}

/// A tool call with interpolated, not yet coerced, argument values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: BTreeMap<String, String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }
}

/// Error raised by a tool's `execute`
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("{0}")]
    Execution(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ToolError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        ToolError::Execution(message.into())
    }
}

/// Tool description as shown to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub arguments: Vec<ToolArgument>,
    pub need_validation: bool,
}

/// The Tool trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, matched case-insensitively
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Declared arguments, in prompt order
    fn arguments(&self) -> Vec<ToolArgument>;

    /// Whether a human must approve each call
    fn need_validation(&self) -> bool {
        false
    }

    /// Execute with coerced arguments (a JSON object keyed by declared name)
    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            arguments: self.arguments(),
            need_validation: self.need_validation(),
        }
    }
}

/// Fetch a required string argument
pub fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::invalid(name, "missing required argument"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_makes_argument_optional() {
        let arg = ToolArgument::int("depth", "Tree depth").with_default("1");
        assert!(!arg.required);
        assert_eq!(arg.default.as_deref(), Some("1"));
    }

    #[test]
    fn test_argument_serializes_type() {
        let value = serde_json::to_value(ToolArgument::bool("force", "Overwrite")).unwrap();
        assert_eq!(value["type"], "bool");
        assert!(value.get("default").is_none());
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let ctx = ToolContext {
            max_output_len: 2,
            ..ToolContext::default()
        };
        let out = ctx.truncate("aé".to_string() + "zzz");
        assert!(out.starts_with("a\n"));
        assert!(out.contains("[Output truncated at 1 characters]"));
    }

    #[test]
    fn test_required_str() {
        let args = json!({"command": "ls", "timeout": 3});
        assert_eq!(required_str(&args, "command").unwrap(), "ls");
        assert!(required_str(&args, "timeout").is_err());
        assert!(required_str(&args, "missing").is_err());
    }
}
