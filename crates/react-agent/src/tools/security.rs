//! Human approval for tools that need validation

use std::io::{self, IsTerminal, Write};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use super::ToolCall;

/// Check if stdin is connected to a terminal
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    Approved,
    Denied,
}

/// Decides whether a validated tool call may run
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    async fn approve(&self, call: &ToolCall) -> Approval;
}

/// Asks on the terminal with a y/n prompt
///
/// Auto mode is the router's business: with `ToolContext::auto_approve` set
/// this handler is never consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalApproval;

#[async_trait]
impl ApprovalHandler for TerminalApproval {
    async fn approve(&self, call: &ToolCall) -> Approval {
        if !is_interactive() {
            warn!(tool = %call.name, "Non-interactive mode: denying tool that needs approval");
            eprintln!(
                "\x1b[93m[Warning]\x1b[0m Tool '{}' needs approval but stdin is not a TTY. Use --auto to allow it.",
                call.name
            );
            return Approval::Denied;
        }

        println!();
        println!("\x1b[93m[approval]\x1b[0m Tool: \x1b[1m{}\x1b[0m", call.name);
        for (name, value) in &call.arguments {
            let mut lines = value.lines();
            println!("  {}: {}", name, lines.next().unwrap_or_default());
            for line in lines {
                println!("  {:width$}  {}", "", line, width = name.len());
            }
        }
        println!();
        print!("Allow this action? [y/n] ");
        let _ = io::stdout().flush();

        // Async stdin keeps the runtime free while waiting
        let mut reader = BufReader::new(tokio::io::stdin());
        let mut input = String::new();
        if reader.read_line(&mut input).await.is_err() {
            debug!("Failed to read stdin, denying");
            return Approval::Denied;
        }

        let result = match input.trim().to_lowercase().as_str() {
            "y" | "yes" => Approval::Approved,
            _ => Approval::Denied,
        };
        debug!(tool = %call.name, result = ?result, "Approval response");
        result
    }
}

/// Approves everything (auto mode, tests)
pub struct AutoApprove;

#[async_trait]
impl ApprovalHandler for AutoApprove {
    async fn approve(&self, _call: &ToolCall) -> Approval {
        Approval::Approved
    }
}

/// Denies everything (tests, read-only runs)
pub struct AutoDeny;

#[async_trait]
impl ApprovalHandler for AutoDeny {
    async fn approve(&self, _call: &ToolCall) -> Approval {
        Approval::Denied
    }
}
