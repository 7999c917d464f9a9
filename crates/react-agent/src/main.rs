//! react: ReAct agent CLI for local LLMs
//!
//! Runs the think/act loop against an Ollama model with file and shell tools.

mod commands;
mod repl;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use commands::RunOptions;

#[derive(Debug, Parser)]
#[command(name = "react")]
#[command(about = "ReAct agent for local LLMs", version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Args)]
struct AgentArgs {
    /// Model to use (name or alias, overrides react.toml)
    #[arg(short, long, env = "REACT_MODEL")]
    model: Option<String>,

    /// Iteration budget (overrides user config)
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Run tools that need approval without asking
    #[arg(long)]
    auto: bool,

    /// Only register read-only tools
    #[arg(long)]
    safe: bool,
}

impl From<AgentArgs> for RunOptions {
    fn from(args: AgentArgs) -> Self {
        Self {
            model: args.model,
            max_iterations: args.max_iterations,
            auto: args.auto,
            safe: args.safe,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Answer one query with the agent
    Ask {
        /// The query
        query: Vec<String>,

        #[command(flatten)]
        agent: AgentArgs,

        /// Output the final state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start interactive REPL
    Chat {
        #[command(flatten)]
        agent: AgentArgs,
    },

    /// List available tools
    Tools {
        /// Only read-only tools
        #[arg(long)]
        safe: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that Ollama is reachable
    Health {
        /// Timeout in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,
    },

    /// Manage user configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Create the default config file
    Init,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins when set
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Ask { query, agent, json }) => {
            commands::ask(&query.join(" "), agent.into(), json).await
        }
        Some(Commands::Chat { agent }) => repl::run(agent.into()).await,
        Some(Commands::Tools { safe, json }) => commands::tools(safe, json).await,
        Some(Commands::Health { timeout }) => commands::health(timeout).await,
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init => commands::config_init().await,
            ConfigAction::Path => commands::config_path().await,
        },
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
        None => {
            // Default to the REPL when no command is given
            repl::run(RunOptions::default()).await
        }
    }
}
