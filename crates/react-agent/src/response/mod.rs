//! Structured agent responses
//!
//! One model turn is parsed into a [`StructuredResponse`]: a thought plus either
//! a tool action or a final answer. Parsing runs a strict XML reader first and
//! an error-tolerant HTML-style reader second; see [`ResponseParser`].

mod extract;
mod interpret;
mod lenient;
mod parser;
mod strict;
mod tree;
mod writer;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use extract::extract_xml;
pub use interpret::ValidationError;
pub use parser::{ParseError, ResponseParser, StageError};
pub use strict::XmlSyntaxError;
pub use writer::{to_xml, write_steps};

/// A unit of planned or completed work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Identifier, also the interpolation variable name
    pub name: String,
    pub description: String,
    pub reason: String,
    /// Set once the step is done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Names of steps whose results feed this one (advisory only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on_steps: Vec<String>,
}

impl Step {
    pub fn new(name: impl Into<String>, description: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            reason: reason.into(),
            result: None,
            depends_on_steps: Vec::new(),
        }
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_dependency(mut self, step_name: impl Into<String>) -> Self {
        self.depends_on_steps.push(step_name.into());
        self
    }
}

/// Structured reasoning with the model's plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub reasoning: String,
    pub to_do: Vec<Step>,
    pub done: Vec<Step>,
}

/// The reasoning part of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Thought {
    /// Plain text reasoning
    Text(String),
    /// Reasoning with `to_do` and `done` steps
    Structured(Plan),
}

impl Thought {
    pub fn reasoning(&self) -> &str {
        match self {
            Thought::Text(text) => text,
            Thought::Structured(plan) => &plan.reasoning,
        }
    }

    pub fn to_do(&self) -> &[Step] {
        match self {
            Thought::Text(_) => &[],
            Thought::Structured(plan) => &plan.to_do,
        }
    }

    pub fn done(&self) -> &[Step] {
        match self {
            Thought::Text(_) => &[],
            Thought::Structured(plan) => &plan.done,
        }
    }
}

impl fmt::Display for Thought {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reasoning())
    }
}

/// A requested tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    /// Matched case-insensitively against registered tools
    pub tool_name: String,
    pub reason: String,
    /// The planned step this call carries out, when the model names it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    /// Raw argument values; may contain `$step_name$` markers
    pub arguments: BTreeMap<String, String>,
}

impl Action {
    pub fn new(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            reason: reason.into(),
            step_name: None,
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn with_step_name(mut self, step_name: impl Into<String>) -> Self {
        self.step_name = Some(step_name.into());
        self
    }
}

/// What the model decided to do this turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Act(Action),
    Answer(String),
}

/// A validated model turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredResponse {
    pub thought: Thought,
    pub decision: Decision,
}

impl StructuredResponse {
    pub fn act(thought: Thought, action: Action) -> Self {
        Self {
            thought,
            decision: Decision::Act(action),
        }
    }

    pub fn answer(thought: Thought, answer: impl Into<String>) -> Self {
        Self {
            thought,
            decision: Decision::Answer(answer.into()),
        }
    }

    pub fn action(&self) -> Option<&Action> {
        match &self.decision {
            Decision::Act(action) => Some(action),
            Decision::Answer(_) => None,
        }
    }

    pub fn final_answer(&self) -> Option<&str> {
        match &self.decision {
            Decision::Act(_) => None,
            Decision::Answer(answer) => Some(answer),
        }
    }
}
