//! User configuration for the react CLI
//!
//! Configuration file: ~/.config/react-agent/config.toml (or platform equivalent)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::agent::AgentConfig;

/// User configuration for the react CLI
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    /// Agent loop defaults
    #[serde(default)]
    pub agent: AgentSection,

    /// Aliases for models
    #[serde(default)]
    pub aliases: AliasConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Run tools that need validation without asking
    #[serde(default)]
    pub auto_approve: bool,

    /// Seconds to wait for an approval answer before denying
    #[serde(default)]
    pub approval_timeout_secs: Option<u64>,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

/// Model aliases
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AliasConfig {
    /// e.g. "code" -> "qwen2.5-coder:14b"
    #[serde(default)]
    pub models: HashMap<String, String>,
}

fn default_max_iterations() -> usize {
    20
}

fn default_command_timeout() -> u64 {
    120
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            auto_approve: false,
            approval_timeout_secs: None,
            command_timeout_secs: default_command_timeout(),
        }
    }
}

const DEFAULT_CONFIG: &str = r#"# react CLI configuration
# Location: ~/.config/react-agent/config.toml

[agent]
# Maximum think/act iterations per query
max_iterations = 20

# Run SHELL_COMMAND and FILE_WRITER without asking
auto_approve = false

# Deny an action if the approval prompt is not answered in time
# approval_timeout_secs = 60

# Default timeout for shell commands
command_timeout_secs = 120

[aliases.models]
# Model aliases for quick access
# code = "qwen2.5-coder:14b"
# small = "llama3.2"
"#;

impl UserConfig {
    /// Load user configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path()?)
    }

    /// Load from a specific path; a missing file yields defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("react-agent").join("config.toml"))
    }

    /// Create a commented default configuration file
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path()?;
        Self::create_default_at(&path)?;
        Ok(path)
    }

    /// Write the default template to `path`, refusing to overwrite
    pub fn create_default_at(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Resolve a model name (check aliases first)
    pub fn resolve_model(&self, name: &str) -> String {
        self.aliases
            .models
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Agent settings seeded from the `[agent]` section
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig::new()
            .with_max_iterations(self.agent.max_iterations)
            .with_auto_approve(self.agent.auto_approve)
            .with_approval_timeout(self.agent.approval_timeout_secs.map(Duration::from_secs))
            .with_command_timeout(self.agent.command_timeout_secs)
    }
}
