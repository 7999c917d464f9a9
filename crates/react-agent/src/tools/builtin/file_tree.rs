//! Directory tree listing tool

use std::cmp::Ordering;
use std::fmt::Write;

use async_trait::async_trait;
use serde_json::Value;
use walkdir::WalkDir;

use crate::tools::{required_str, Tool, ToolArgument, ToolContext, ToolError};

/// Lists a directory as an indented tree with entry kinds and sizes
pub struct FileTreeTool;

#[async_trait]
impl Tool for FileTreeTool {
    fn name(&self) -> &str {
        "FILE_TREE"
    }

    fn description(&self) -> &str {
        "List the files in a directory as a tree, with the kind (file/directory) and size of each entry."
    }

    fn arguments(&self) -> Vec<ToolArgument> {
        vec![
            ToolArgument::string("directory", "The directory to list."),
            ToolArgument::int("depth", "How many levels to descend (0 for all levels).").with_default("1"),
        ]
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let directory = required_str(args, "directory")?;
        let depth = args.get("depth").and_then(Value::as_i64).unwrap_or(1);
        if depth < 0 {
            return Err(ToolError::invalid("depth", "must be a non-negative integer"));
        }

        let root = ctx.resolve_path(directory);
        if !root.exists() {
            return Err(ToolError::execution(format!("Path '{}' does not exist.", root.display())));
        }
        if !root.is_dir() {
            return Err(ToolError::execution(format!("Path '{}' is not a directory.", root.display())));
        }

        let max_depth = if depth == 0 { usize::MAX } else { depth as usize };
        let walker = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by(|a, b| match (a.file_type().is_dir(), b.file_type().is_dir()) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => a.file_name().cmp(b.file_name()),
            });

        let mut tree = String::new();
        for entry in walker {
            let indent = "  ".repeat(entry.as_ref().map(|e| e.depth() - 1).unwrap_or(0));
            match entry {
                Ok(entry) => {
                    let name = entry.file_name().to_string_lossy();
                    if entry.file_type().is_dir() {
                        let _ = writeln!(tree, "{indent}- {name} (Directory, Size: -)");
                    } else {
                        let size = entry
                            .metadata()
                            .map(|m| format!("{} bytes", m.len()))
                            .unwrap_or_else(|_| "??? bytes".to_string());
                        let _ = writeln!(tree, "{indent}- {name} (File, Size: {size})");
                    }
                }
                Err(e) => {
                    let _ = writeln!(tree, "{indent}- (Error: {e})");
                }
            }
        }

        if tree.is_empty() {
            return Ok(format!("Directory '{}' is empty.", root.display()));
        }
        Ok(ctx.truncate(tree))
    }
}
