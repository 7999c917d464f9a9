//! Ollama API client

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::model::{Generation, GenerativeModel};

/// Ollama service status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OllamaStatus {
    /// Service is running and ready
    Running,
    /// Service is stopped or unreachable
    Stopped,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: i64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new client; `timeout` bounds every request
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is running
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Get current status
    pub async fn status(&self) -> OllamaStatus {
        if self.health_check().await.unwrap_or(false) {
            OllamaStatus::Running
        } else {
            OllamaStatus::Stopped
        }
    }

    /// Run a non-streaming completion
    pub async fn generate(&self, options: &ModelOptions, prompt: &str) -> Result<Generation> {
        let url = format!("{}/api/generate", self.base_url);

        let req = GenerateRequest {
            model: &options.model,
            prompt,
            system: options.system.as_deref(),
            stream: false,
            options: GenerateOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        let started = Instant::now();
        let resp: GenerateResponse = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("Failed to connect to Ollama")?
            .error_for_status()
            .context("Generation request failed")?
            .json()
            .await
            .context("Failed to parse generation response")?;
        let elapsed = started.elapsed();

        debug!(
            model = %options.model,
            prompt_tokens = resp.prompt_eval_count,
            completion_tokens = resp.eval_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "Generation finished"
        );

        Ok(Generation::text(resp.response).with_usage(resp.prompt_eval_count, resp.eval_count, elapsed))
    }
}

/// Sampling options for a model
#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub model: String,
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: i64,
}

impl ModelOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            temperature: 0.7,
            max_tokens: 4096,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: i64) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A `GenerativeModel` served by Ollama
#[derive(Debug, Clone)]
pub struct OllamaModel {
    client: OllamaClient,
    options: ModelOptions,
}

impl OllamaModel {
    pub fn new(client: OllamaClient, options: ModelOptions) -> Self {
        Self { client, options }
    }

    /// Build a model from project configuration, optionally overriding the model name
    pub fn from_config(config: &Config, model_override: Option<String>) -> Result<Self> {
        let client = OllamaClient::new(
            config.ollama_url(),
            Duration::from_secs(config.model.request_timeout_secs),
        )?;

        let mut options = ModelOptions::new(model_override.unwrap_or_else(|| config.model.name.clone()))
            .with_temperature(config.model.temperature)
            .with_max_tokens(config.model.max_tokens);
        if let Some(ref system) = config.model.system {
            options = options.with_system(system.clone());
        }

        Ok(Self::new(client, options))
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }
}

#[async_trait]
impl GenerativeModel for OllamaModel {
    fn name(&self) -> &str {
        &self.options.model
    }

    async fn generate(&self, prompt: &str) -> Result<Generation> {
        self.client.generate(&self.options, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_shape() {
        let options = ModelOptions::new("qwen").with_system("be brief").with_max_tokens(64);
        let req = GenerateRequest {
            model: &options.model,
            prompt: "hi",
            system: options.system.as_deref(),
            stream: false,
            options: GenerateOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["model"], "qwen");
        assert_eq!(value["system"], "be brief");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["num_predict"], 64);
    }

    #[test]
    fn test_generate_response_defaults_usage() {
        let resp: GenerateResponse = serde_json::from_str(r#"{"response": "ok", "done": true}"#).unwrap();
        assert_eq!(resp.response, "ok");
        assert_eq!(resp.prompt_eval_count, 0);
        assert_eq!(resp.eval_count, 0);
    }

    #[test]
    fn test_model_from_config_override() {
        let config = Config::default_minimal();
        let model = OllamaModel::from_config(&config, Some("llama3.2".to_string())).unwrap();
        assert_eq!(model.name(), "llama3.2");
        assert_eq!(model.client().base_url(), "http://127.0.0.1:11434");
    }
}
