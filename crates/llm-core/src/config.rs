//! Configuration management for react.toml

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name searched for in the current directory and its parents
pub const CONFIG_FILE: &str = "react.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Model name as known to Ollama
    #[serde(default = "default_model")]
    pub name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i64,
    /// System prompt sent with every generation
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    11434
}

fn default_model() -> String {
    "qwen2.5-coder:14b".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> i64 {
    4096
}

fn default_request_timeout() -> u64 {
    300
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from react.toml
    pub fn load() -> Result<Self> {
        Self::load_from(Self::find_config_path()?)
    }

    /// Try to load configuration, returning None if not found
    pub fn try_load() -> Option<Self> {
        Self::load().ok()
    }

    /// Configuration used when react.toml is missing
    pub fn default_minimal() -> Self {
        Self::default()
    }

    /// Load configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
    }

    /// Find react.toml by searching current directory and parents
    pub fn find_config_path() -> Result<PathBuf> {
        Self::find_config_path_from(std::env::current_dir()?)
    }

    fn find_config_path_from(mut current: PathBuf) -> Result<PathBuf> {
        for _ in 0..10 {
            let candidate = current.join(CONFIG_FILE);
            if candidate.exists() {
                return Ok(candidate);
            }
            if !current.pop() {
                break;
            }
        }

        anyhow::bail!("{} not found in current directory or parents", CONFIG_FILE)
    }

    /// Get Ollama base URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }
}
