//! CLI commands implementation

use anyhow::{Context, Result};
use llm_core::{Config, OllamaModel, OllamaStatus};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use react_agent::tools::builtin::{create_default_registry, create_safe_registry};
use react_agent::tools::router::ToolRouter;
use react_agent::tools::security::TerminalApproval;
use react_agent::{AgentLoop, AgentPhase, UserConfig};

// ANSI color codes
pub const GREEN: &str = "\x1b[92m";
pub const RED: &str = "\x1b[91m";
pub const YELLOW: &str = "\x1b[93m";
pub const BLUE: &str = "\x1b[94m";
pub const CYAN: &str = "\x1b[96m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RESET: &str = "\x1b[0m";

/// Options shared by `ask` and `chat`
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub model: Option<String>,
    pub max_iterations: Option<usize>,
    pub auto: bool,
    pub safe: bool,
}

fn load_project_config() -> Config {
    match Config::try_load() {
        Some(config) => config,
        None => {
            debug!("react.toml not found, using defaults");
            Config::default_minimal()
        }
    }
}

fn load_user_config() -> UserConfig {
    UserConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable user config");
        UserConfig::default()
    })
}

/// Build an agent from react.toml, the user config and CLI flags
pub async fn build_agent(options: &RunOptions, verbose: bool) -> Result<AgentLoop> {
    let config = load_project_config();
    let user_config = load_user_config();

    let model_name = options.model.as_deref().map(|name| user_config.resolve_model(name));
    let model = OllamaModel::from_config(&config, model_name)?;

    if !model.client().health_check().await.unwrap_or(false) {
        anyhow::bail!(
            "Ollama is not running at {}.\nStart with: {}ollama serve{}",
            model.client().base_url(),
            BLUE,
            RESET
        );
    }

    let registry = if options.safe {
        create_safe_registry()
    } else {
        create_default_registry()
    };
    let router = ToolRouter::new(registry, TerminalApproval);
    let auto = options.auto || user_config.agent.auto_approve;

    let mut agent_config = user_config
        .agent_config()
        .with_working_dir(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
        .with_auto_approve(auto)
        .with_verbose(verbose);
    if let Some(max) = options.max_iterations {
        agent_config = agent_config.with_max_iterations(max);
    }

    Ok(AgentLoop::new(Arc::new(model), router, agent_config))
}

/// One-shot query through the agent loop
pub async fn ask(query: &str, options: RunOptions, json_output: bool) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("No query given");
    }

    let agent = build_agent(&options, !json_output).await?;

    if !json_output {
        println!("{}Agent{}", BOLD, RESET);
        println!("  Model: {}", agent.model_name());
        println!("  Max iterations: {}", agent.config().max_iterations);
        println!(
            "  Auto approve: {}",
            if agent.config().auto_approve { "yes" } else { "no" }
        );
        println!();
    }

    let state = agent.run(query).await;

    if json_output {
        let output = serde_json::json!({
            "model": agent.model_name(),
            "query": state.query,
            "answer": state.final_response,
            "error": state.error,
            "phase": state.phase,
            "iterations": state.iteration,
            "ledger": state.ledger,
            "usage": state.usage,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    match state.phase {
        AgentPhase::Complete => {
            println!("{}Final Response:{}", BOLD, RESET);
            println!("{}", state.outcome());
        }
        AgentPhase::Error => {
            println!("{}Error:{} {}", RED, RESET, state.outcome());
        }
        _ => {
            println!("{}{}{}", YELLOW, state.outcome(), RESET);
        }
    }
    println!();
    println!(
        "{}{} iterations, {}{}",
        DIM,
        state.iteration,
        state.usage.summary(),
        RESET
    );

    Ok(())
}

/// List registered tools
pub async fn tools(safe: bool, json_output: bool) -> Result<()> {
    let registry = if safe {
        create_safe_registry()
    } else {
        create_default_registry()
    };
    let definitions = registry.tool_definitions();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    println!("{}Tools ({}){}", BOLD, definitions.len(), RESET);
    for def in definitions {
        let approval = if def.need_validation {
            format!(" {}[approval]{}", YELLOW, RESET)
        } else {
            String::new()
        };
        println!("  {}{}{}{}", CYAN, def.name, RESET, approval);
        println!("    {}", def.description);
        for arg in def.arguments {
            let mut detail = arg.arg_type.to_string();
            if let Some(default) = arg.default {
                detail.push_str(&format!(", default {default}"));
            } else if !arg.required {
                detail.push_str(", optional");
            }
            println!("    {}- {} ({}){}: {}", DIM, arg.name, detail, RESET, arg.description);
        }
    }

    Ok(())
}

/// Wait for Ollama to answer, up to `timeout_secs`
pub async fn health(timeout_secs: u64) -> Result<()> {
    let config = load_project_config();
    let client = llm_core::OllamaClient::new(
        config.ollama_url(),
        Duration::from_secs(config.model.request_timeout_secs),
    )?;

    let start = Instant::now();
    let timeout = Duration::from_secs(timeout_secs);
    let interval = Duration::from_secs(1);

    loop {
        if client.status().await == OllamaStatus::Running {
            println!("{}✓{} Ollama is ready at {}", GREEN, RESET, client.base_url());
            println!("  Model: {}", config.model.name);
            return Ok(());
        }
        if start.elapsed() >= timeout {
            break;
        }
        debug!(elapsed_secs = start.elapsed().as_secs(), "Waiting for Ollama");
        tokio::time::sleep(interval).await;
    }

    println!(
        "{}✗{} Ollama did not become ready within {}s",
        RED, RESET, timeout_secs
    );
    anyhow::bail!("Ollama is not reachable at {}", client.base_url())
}

/// Create the default user config file
pub async fn config_init() -> Result<()> {
    let path = UserConfig::config_path()?;
    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    let path = UserConfig::create_default().context("Failed to create user config")?;
    println!("{}Created:{} {}", GREEN, RESET, path.display());
    println!("\nEdit this file to change agent defaults and model aliases.");

    Ok(())
}

/// Print config file path
pub async fn config_path() -> Result<()> {
    let path = UserConfig::config_path()?;
    println!("{}", path.display());

    Ok(())
}
