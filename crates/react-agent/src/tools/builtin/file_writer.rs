//! File write tool

use std::fs;
use std::io::Write;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{required_str, Tool, ToolArgument, ToolContext, ToolError};

/// Writes or appends text to a file, creating parent directories
pub struct FileWriterTool;

#[async_trait]
impl Tool for FileWriterTool {
    fn name(&self) -> &str {
        "FILE_WRITER"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates parent directories as needed. Mode 'w' overwrites, 'a' appends."
    }

    fn arguments(&self) -> Vec<ToolArgument> {
        vec![
            ToolArgument::string("file_path", "The path of the file to write."),
            ToolArgument::string("content", "The content to write."),
            ToolArgument::string("mode", "'w' to overwrite or 'a' to append.").with_default("w"),
        ]
    }

    fn need_validation(&self) -> bool {
        true
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let file_path = required_str(args, "file_path")?;
        let content = required_str(args, "content")?;
        let mode = args.get("mode").and_then(Value::as_str).unwrap_or("w");

        if file_path.trim().is_empty() {
            return Err(ToolError::invalid("file_path", "must not be empty"));
        }
        if content.trim().is_empty() {
            return Err(ToolError::invalid("content", "must not be empty"));
        }
        let append = match mode {
            "w" => false,
            "a" => true,
            other => return Err(ToolError::invalid("mode", format!("expected 'w' or 'a', got '{other}'"))),
        };

        let path = ctx.resolve_path(file_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if append {
            let mut file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
            file.write_all(content.as_bytes())?;
        } else {
            fs::write(&path, content)?;
        }

        Ok(format!(
            "Successfully wrote {} characters to {}",
            content.chars().count(),
            path.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ToolContext::new(temp_dir.path().to_path_buf());
        let args = json!({ "file_path": "a/b/test.txt", "content": "Hello, World!" });

        let result = FileWriterTool.execute(&args, &ctx).await.unwrap();
        assert!(result.contains("13 characters"));
        assert_eq!(fs::read_to_string(temp_dir.path().join("a/b/test.txt")).unwrap(), "Hello, World!");
    }

    #[tokio::test]
    async fn test_write_append() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("append.txt");
        fs::write(&file_path, "line1\n").unwrap();

        let args = json!({ "file_path": file_path.to_str().unwrap(), "content": "line2\n", "mode": "a" });
        FileWriterTool.execute(&args, &ToolContext::default()).await.unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "line1\nline2\n");
    }

    #[tokio::test]
    async fn test_write_rejects_empty_content_and_bad_mode() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ToolContext::new(temp_dir.path().to_path_buf());

        let empty = json!({ "file_path": "x.txt", "content": "   " });
        assert!(FileWriterTool.execute(&empty, &ctx).await.is_err());

        let bad_mode = json!({ "file_path": "x.txt", "content": "data", "mode": "x" });
        assert!(FileWriterTool.execute(&bad_mode, &ctx).await.is_err());
        assert!(!temp_dir.path().join("x.txt").exists());
    }
}
