//! Shell command execution tool

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::tools::{required_str, Tool, ToolArgument, ToolContext, ToolError};

/// Runs a command through `bash -c` under a timeout
pub struct ShellCommandTool;

#[async_trait]
impl Tool for ShellCommandTool {
    fn name(&self) -> &str {
        "SHELL_COMMAND"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its output (stdout, then stderr)."
    }

    fn arguments(&self) -> Vec<ToolArgument> {
        vec![
            ToolArgument::string("command", "The shell command to execute."),
            ToolArgument::int("timeout", "Timeout in seconds (default: the configured command timeout).").optional(),
        ]
    }

    fn need_validation(&self) -> bool {
        true
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let command = required_str(args, "command")?;
        let timeout_secs = match args.get("timeout").and_then(Value::as_i64) {
            Some(secs) if secs <= 0 => return Err(ToolError::invalid("timeout", "must be positive")),
            Some(secs) => secs as u64,
            None => ctx.command_timeout_secs,
        };

        if !ctx.working_dir.exists() {
            return Err(ToolError::execution(format!(
                "Working directory does not exist: {}",
                ctx.working_dir.display()
            )));
        }

        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("bash", "-c")
        };

        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg)
            .arg(command)
            .current_dir(&ctx.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(Duration::from_secs(timeout_secs), cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ToolError::execution(format!(
                    "Command timed out after {timeout_secs} seconds"
                )))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut combined = stdout.into_owned();
        if !stderr.is_empty() {
            if !combined.is_empty() {
                combined.push_str("\n--- stderr ---\n");
            }
            combined.push_str(&stderr);
        }
        let combined = ctx.truncate(combined);

        if output.status.success() {
            Ok(combined)
        } else {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            Err(ToolError::execution(format!(
                "Command failed with exit code {code}: {}",
                combined.trim_end()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_shell_echo() {
        let result = ShellCommandTool
            .execute(&json!({ "command": "echo 'hello world'" }), &ToolContext::default())
            .await
            .unwrap();
        assert!(result.contains("hello world"));
    }

    #[tokio::test]
    async fn test_shell_runs_in_working_dir() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ToolContext::new(temp_dir.path().to_path_buf());

        let result = ShellCommandTool.execute(&json!({ "command": "pwd" }), &ctx).await.unwrap();
        let expected = temp_dir.path().canonicalize().unwrap();
        assert!(result.contains(expected.to_str().unwrap()) || result.contains(temp_dir.path().to_str().unwrap()));
    }

    #[tokio::test]
    async fn test_shell_failure_carries_stderr() {
        let err = ShellCommandTool
            .execute(&json!({ "command": "echo boom >&2; exit 3" }), &ToolContext::default())
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("exit code 3"));
        assert!(message.contains("boom"));
    }

    #[tokio::test]
    async fn test_shell_timeout() {
        let err = ShellCommandTool
            .execute(&json!({ "command": "sleep 10", "timeout": 1 }), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
