//! Tool routing and dispatch

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, info, instrument, warn};

use super::coerce::{coerce_arguments, ArgumentError};
use super::registry::ToolRegistry;
use super::security::{Approval, ApprovalHandler};
use super::{ToolCall, ToolContext, ToolError};

/// Result of routing a tool call
#[derive(Debug)]
pub enum RouteResult {
    /// Tool output
    Success(String),
    /// No tool with that name
    NotFound(String),
    /// Approval was refused or timed out
    NotApproved(String),
    /// Arguments did not match the declaration
    InvalidArguments { tool: String, error: ArgumentError },
    /// The tool returned an error
    Failed { tool: String, error: ToolError },
    /// The tool panicked
    Crashed { tool: String, message: String },
}

/// Router for dispatching tool calls
pub struct ToolRouter {
    registry: ToolRegistry,
    approval: Arc<dyn ApprovalHandler>,
}

impl ToolRouter {
    pub fn new(registry: ToolRegistry, approval: impl ApprovalHandler + 'static) -> Self {
        Self {
            registry,
            approval: Arc::new(approval),
        }
    }

    /// Look up, approve, coerce and execute one call
    #[instrument(skip(self, ctx), fields(tool = %call.name))]
    pub async fn route(&self, call: &ToolCall, ctx: &ToolContext) -> RouteResult {
        let tool = match self.registry.get(&call.name) {
            Some(t) => t,
            None => {
                warn!(tool = %call.name, "Tool not found");
                return RouteResult::NotFound(call.name.clone());
            }
        };
        let name = tool.name().to_string();

        if tool.need_validation() && !ctx.auto_approve {
            debug!("Requesting approval");
            let approval = match ctx.approval_timeout {
                Some(limit) => match tokio::time::timeout(limit, self.approval.approve(call)).await {
                    Ok(approval) => approval,
                    Err(_) => {
                        warn!(tool = %name, timeout_secs = limit.as_secs(), "Approval timed out");
                        Approval::Denied
                    }
                },
                None => self.approval.approve(call).await,
            };
            if approval == Approval::Denied {
                info!(tool = %name, "Tool execution not approved");
                return RouteResult::NotApproved(name);
            }
        }

        let args = match coerce_arguments(&tool.arguments(), &call.arguments) {
            Ok(args) => args,
            Err(error) => {
                warn!(tool = %name, error = %error, "Invalid tool arguments");
                return RouteResult::InvalidArguments { tool: name, error };
            }
        };

        info!(tool = %name, "Executing tool");
        match AssertUnwindSafe(tool.execute(&args, ctx)).catch_unwind().await {
            Ok(Ok(output)) => {
                info!(tool = %name, output_len = output.len(), "Tool executed successfully");
                RouteResult::Success(output)
            }
            Ok(Err(error)) => {
                warn!(tool = %name, error = %error, "Tool execution failed");
                RouteResult::Failed { tool: name, error }
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(tool = %name, panic = %message, "Tool panicked");
                RouteResult::Crashed { tool: name, message }
            }
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl std::fmt::Debug for ToolRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRouter")
            .field("registry", &self.registry)
            .finish()
    }
}
