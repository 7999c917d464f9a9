//! Errors raised while driving the loop

use thiserror::Error;

use crate::response::ParseError;
use crate::tools::coerce::ArgumentError;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The reply could not be turned into a valid turn
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Action not approved: {0}")]
    ToolNotApproved(String),

    #[error("Invalid arguments for tool {tool}: {source}")]
    ArgumentCoercionFailed {
        tool: String,
        #[source]
        source: ArgumentError,
    },

    #[error("Error executing tool {tool}: {message}")]
    ToolExecutionFailed { tool: String, message: String },

    #[error("Tool {tool} crashed: {message}")]
    ToolCrashed { tool: String, message: String },

    #[error("Model invocation failed: {0}")]
    ModelInvocationFailed(String),

    #[error("Reached maximum iterations ({0}) without a final answer")]
    IterationBudgetExhausted(usize),
}

impl AgentError {
    /// Whether the loop feeds this back to the model and keeps going
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AgentError::Parse(_)
                | AgentError::ToolNotFound(_)
                | AgentError::ToolNotApproved(_)
                | AgentError::ArgumentCoercionFailed { .. }
                | AgentError::ToolExecutionFailed { .. }
        )
    }
}
