//! ReAct agent
//!
//! Each iteration asks the model for an XML response, parses it, then either
//! returns the final answer or routes one tool call and records the observation.

mod agent_loop;
mod error;
mod prompt;
mod state;

pub use agent_loop::AgentLoop;
pub use error::AgentError;
pub use prompt::build_prompt;
pub use state::{AgentConfig, AgentPhase, AgentState, HistoryEntry, Role, TokenUsage, NO_ANSWER};
