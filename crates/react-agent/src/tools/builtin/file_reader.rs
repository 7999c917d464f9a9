//! File read tool

use std::fs;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{required_str, Tool, ToolArgument, ToolContext, ToolError};

/// Reads a UTF-8 text file
pub struct FileReaderTool;

#[async_trait]
impl Tool for FileReaderTool {
    fn name(&self) -> &str {
        "FILE_READER"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file (absolute path or relative to the working directory)."
    }

    fn arguments(&self) -> Vec<ToolArgument> {
        vec![
            ToolArgument::string("file_path", "The path of the file to read."),
            ToolArgument::string("encoding", "The file encoding; only utf-8 is supported.").with_default("utf-8"),
        ]
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let file_path = required_str(args, "file_path")?;
        if file_path.trim().is_empty() {
            return Err(ToolError::invalid("file_path", "must not be empty"));
        }

        let encoding = args.get("encoding").and_then(Value::as_str).unwrap_or("utf-8");
        if !matches!(encoding.to_lowercase().as_str(), "utf-8" | "utf8") {
            return Err(ToolError::invalid("encoding", format!("unsupported encoding '{encoding}'")));
        }

        let path = ctx.resolve_path(file_path);
        if !path.exists() {
            return Err(ToolError::execution(format!("File '{}' does not exist.", path.display())));
        }
        if !path.is_file() {
            return Err(ToolError::execution(format!("Path '{}' is not a file.", path.display())));
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            ToolError::execution(format!("Failed to read '{}' as {encoding}: {e}", path.display()))
        })?;

        Ok(ctx.truncate(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_read_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "line 1").unwrap();
        writeln!(temp, "line 2").unwrap();

        let args = json!({ "file_path": temp.path().to_str().unwrap() });
        let result = FileReaderTool.execute(&args, &ToolContext::default()).await.unwrap();
        assert_eq!(result, "line 1\nline 2\n");
    }

    #[tokio::test]
    async fn test_read_nonexistent_file() {
        let args = json!({ "file_path": "/nonexistent/path/file.txt" });
        let err = FileReaderTool.execute(&args, &ToolContext::default()).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_read_rejects_other_encodings() {
        let temp = NamedTempFile::new().unwrap();
        let args = json!({ "file_path": temp.path().to_str().unwrap(), "encoding": "latin-1" });
        let err = FileReaderTool.execute(&args, &ToolContext::default()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { .. }));
    }
}
