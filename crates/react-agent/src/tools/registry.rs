//! Tool registry keyed by uppercase tool name

use std::collections::HashMap;
use std::sync::Arc;

use super::{Tool, ToolDefinition};

/// Registry of available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_uppercase(), tool);
    }

    /// Get a tool by name, ignoring case
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(&name.to_uppercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(&name.to_uppercase())
    }

    /// Registered tool names, sorted
    pub fn list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.values().map(|t| t.name()).collect();
        names.sort_unstable();
        names
    }

    /// Tool definitions for the prompt, sorted by name
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list_names())
            .finish()
    }
}
