//! Built-in tools

mod file_reader;
mod file_tree;
mod file_writer;
mod shell_command;

pub use file_reader::FileReaderTool;
pub use file_tree::FileTreeTool;
pub use file_writer::FileWriterTool;
pub use shell_command::ShellCommandTool;

use super::registry::ToolRegistry;

/// Create a registry with all built-in tools
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = create_safe_registry();

    // Need approval
    registry.register(FileWriterTool);
    registry.register(ShellCommandTool);

    registry
}

/// Create a registry with only read-only tools
pub fn create_safe_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(FileReaderTool);
    registry.register(FileTreeTool);

    registry
}
