//! react-agent: a ReAct loop over local models
//!
//! Provides:
//! - The XML response model with a strict parser and a lenient fallback
//! - The step ledger with `$name$` result interpolation
//! - Tool contract, registry, argument coercion, approval and routing
//! - The agent loop state machine and prompt builder
//! - User configuration (~/.config/react-agent/config.toml)

pub mod agent;
pub mod config;
pub mod ledger;
pub mod response;
pub mod tools;

pub use agent::{AgentConfig, AgentError, AgentLoop, AgentPhase, AgentState, NO_ANSWER};
pub use config::UserConfig;
pub use ledger::{LedgerFormat, StepLedger};
pub use response::{Action, Decision, ParseError, ResponseParser, Step, StructuredResponse, Thought};
pub use tools::registry::ToolRegistry;
pub use tools::router::{RouteResult, ToolRouter};
pub use tools::{Tool, ToolArgument, ToolCall, ToolContext, ToolError};
