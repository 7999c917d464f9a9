//! llm-core: model access for the ReAct agent
//!
//! Provides:
//! - The `GenerativeModel` contract consumed by the agent loop
//! - Ollama API client and an Ollama-backed model
//! - Configuration loading (react.toml)

pub mod config;
pub mod model;
pub mod ollama;

pub use config::{Config, ModelConfig, OllamaConfig};
pub use model::{Generation, GenerativeModel};
pub use ollama::{ModelOptions, OllamaClient, OllamaModel, OllamaStatus};
