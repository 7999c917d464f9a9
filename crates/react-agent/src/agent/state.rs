//! Agent configuration and per-query state

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use llm_core::Generation;
use serde::Serialize;
use tracing::debug;

use crate::ledger::{LedgerFormat, StepLedger};
use crate::response::Thought;

/// Returned by [`AgentLoop::execute`](super::AgentLoop::execute) when the iteration budget runs out
pub const NO_ANSWER: &str = "Unable to provide an answer after maximum iterations.";

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum THINKING entries before giving up
    pub max_iterations: usize,
    /// Working directory for tools
    pub working_dir: PathBuf,
    /// Skip approval for tools that need validation
    pub auto_approve: bool,
    /// Bound on the approval prompt; `None` waits indefinitely
    pub approval_timeout: Option<Duration>,
    /// Default shell command timeout in seconds
    pub command_timeout_secs: u64,
    /// How the ledger is rendered into the prompt
    pub ledger_format: LedgerFormat,
    /// Print iteration progress to stdout
    pub verbose: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            auto_approve: false,
            approval_timeout: None,
            command_timeout_secs: 120,
            ledger_format: LedgerFormat::Xml,
            verbose: false,
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn with_auto_approve(mut self, auto: bool) -> Self {
        self.auto_approve = auto;
        self
    }

    pub fn with_approval_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.approval_timeout = timeout;
        self
    }

    pub fn with_command_timeout(mut self, secs: u64) -> Self {
        self.command_timeout_secs = secs;
        self
    }

    pub fn with_ledger_format(mut self, format: LedgerFormat) -> Self {
        self.ledger_format = format;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Loop state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentPhase {
    Ready,
    Thinking,
    Deciding,
    Complete,
    Error,
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentPhase::Ready => "READY",
            AgentPhase::Thinking => "THINKING",
            AgentPhase::Deciding => "DECIDING",
            AgentPhase::Complete => "COMPLETE",
            AgentPhase::Error => "ERROR",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// One line of session history
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.role,
            self.content
        )
    }
}

/// Token usage across a run; logged, not enforced
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub calls: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl TokenUsage {
    pub fn record(&mut self, generation: &Generation) {
        self.prompt_tokens += generation.prompt_tokens;
        self.completion_tokens += generation.completion_tokens;
        self.calls += 1;
        self.elapsed += generation.elapsed;
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn summary(&self) -> String {
        format!(
            "{} calls, {} prompt + {} completion = {} tokens in {:.1}s",
            self.calls,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens(),
            self.elapsed.as_secs_f64()
        )
    }
}

/// State of one `run`
#[derive(Debug)]
pub struct AgentState {
    pub query: String,
    pub phase: AgentPhase,
    /// THINKING entries so far
    pub iteration: usize,
    pub history: Vec<HistoryEntry>,
    pub ledger: StepLedger,
    /// Thoughts of every successfully parsed turn
    pub thoughts: Vec<Thought>,
    pub final_response: Option<String>,
    pub error: Option<String>,
    pub usage: TokenUsage,
}

impl AgentState {
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        let mut state = Self {
            query: query.clone(),
            phase: AgentPhase::Ready,
            iteration: 0,
            history: Vec::new(),
            ledger: StepLedger::new(),
            thoughts: Vec::new(),
            final_response: None,
            error: None,
            usage: TokenUsage::default(),
        };
        state.add_history(Role::User, query);
        state
    }

    pub fn add_history(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(HistoryEntry {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn transition(&mut self, phase: AgentPhase) {
        debug!(from = %self.phase, to = %phase, iteration = self.iteration, "Phase transition");
        self.phase = phase;
    }

    pub fn mark_complete(&mut self, answer: String) {
        self.final_response = Some(answer);
        self.transition(AgentPhase::Complete);
    }

    pub fn mark_error(&mut self, error: String) {
        self.error = Some(error);
        self.transition(AgentPhase::Error);
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, AgentPhase::Complete | AgentPhase::Error)
    }

    /// The answer, an error message, or [`NO_ANSWER`]
    pub fn outcome(&self) -> String {
        if let Some(answer) = &self.final_response {
            answer.clone()
        } else if let Some(error) = &self.error {
            format!("An error occurred while processing your query: {error}")
        } else {
            NO_ANSWER.to_string()
        }
    }

    /// History rendered one entry per line
    pub fn render_history(&self) -> String {
        self.history
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_builder() {
        let config = AgentConfig::new()
            .with_max_iterations(3)
            .with_auto_approve(true)
            .with_approval_timeout(Some(Duration::from_secs(30)));

        assert_eq!(config.max_iterations, 3);
        assert!(config.auto_approve);
        assert_eq!(config.approval_timeout, Some(Duration::from_secs(30)));
        assert_eq!(AgentConfig::default().max_iterations, 20);
    }

    #[test]
    fn test_state_starts_ready_with_query() {
        let state = AgentState::new("What is 2+2?");
        assert_eq!(state.phase, AgentPhase::Ready);
        assert_eq!(state.iteration, 0);
        assert_eq!(state.history.len(), 1);
        assert!(state.render_history().ends_with("user: What is 2+2?"));
        assert!(!state.is_finished());
    }

    #[test]
    fn test_terminal_phases() {
        let mut state = AgentState::new("q");
        state.mark_complete("4".into());
        assert!(state.is_finished());
        assert_eq!(state.final_response.as_deref(), Some("4"));

        let mut state = AgentState::new("q");
        assert_eq!(state.outcome(), NO_ANSWER);
        state.mark_error("down".into());
        assert_eq!(state.phase, AgentPhase::Error);
        assert_eq!(state.outcome(), "An error occurred while processing your query: down");
    }

    #[test]
    fn test_token_usage() {
        let mut usage = TokenUsage::default();
        usage.record(&Generation::text("a").with_usage(10, 5, Duration::from_secs(1)));
        usage.record(&Generation::text("b").with_usage(20, 5, Duration::from_secs(1)));
        assert_eq!(usage.total_tokens(), 40);
        assert_eq!(usage.calls, 2);
    }
}
