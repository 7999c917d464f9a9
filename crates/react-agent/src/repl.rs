//! Interactive REPL: each line is one agent query
//!
//! Readline input with persistent history and a few slash commands.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use std::path::PathBuf;

use react_agent::{AgentLoop, AgentState};

use crate::commands::{build_agent, RunOptions, BOLD, CYAN, DIM, GREEN, RESET, YELLOW};

struct ReplState {
    agent: AgentLoop,
    /// State of the most recent query
    last: Option<AgentState>,
}

fn history_path() -> Option<PathBuf> {
    let dir = dirs::data_dir()?.join("react-agent");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join("history.txt"))
}

/// Run the interactive REPL
pub async fn run(options: RunOptions) -> Result<()> {
    let mut state = ReplState {
        agent: build_agent(&options, true).await?,
        last: None,
    };

    let history = history_path();
    let mut rl: Editor<(), DefaultHistory> = DefaultEditor::new()?;
    if let Some(ref path) = history {
        let _ = rl.load_history(path);
    }

    print_welcome(&state);

    loop {
        let prompt = format!("{}react>{} ", CYAN, RESET);

        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if line.starts_with('/') {
                    if handle_slash_command(&mut state, line) {
                        break;
                    }
                    continue;
                }

                let run = state.agent.run(line).await;
                println!();
                println!("{}{}{}", GREEN, run.outcome(), RESET);
                println!("{}{}{}", DIM, run.usage.summary(), RESET);
                println!();
                state.last = Some(run);
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}^C{}", DIM, RESET);
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}Goodbye!{}", DIM, RESET);
                break;
            }
            Err(e) => {
                eprintln!("{}Error:{} {}", YELLOW, RESET, e);
                break;
            }
        }
    }

    if let Some(ref path) = history {
        let _ = rl.save_history(path);
    }

    Ok(())
}

fn print_welcome(state: &ReplState) {
    println!();
    println!("{}react{} - ReAct agent", BOLD, RESET);
    println!("  Model: {}", state.agent.model_name());
    println!("  Tools: {}", state.agent.router().registry().list_names().join(", "));
    println!("  Type {}/help{} for commands", CYAN, RESET);
    println!();
}

/// Returns true when the REPL should exit
fn handle_slash_command(state: &mut ReplState, input: &str) -> bool {
    let cmd = input.split_whitespace().next().unwrap_or("").to_lowercase();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => print_help(),
        "/exit" | "/quit" | "/q" => {
            println!("{}Goodbye!{}", DIM, RESET);
            return true;
        }
        "/tools" => {
            for def in state.agent.router().registry().tool_definitions() {
                println!("  {}{}{} - {}", CYAN, def.name, RESET, def.description);
            }
        }
        "/history" | "/hist" => match &state.last {
            Some(last) => println!("{}", last.render_history()),
            None => println!("No query run yet"),
        },
        "/steps" => match &state.last {
            Some(last) if !last.ledger.done().is_empty() => {
                for step in last.ledger.done() {
                    println!(
                        "  {}{}{}: {}",
                        BOLD,
                        step.name,
                        RESET,
                        step.result.as_deref().unwrap_or("").replace('\n', " ")
                    );
                }
            }
            _ => println!("No completed steps"),
        },
        _ => {
            println!("{}Unknown command:{} {}", YELLOW, RESET, cmd);
            println!("Type {}/help{} for available commands", CYAN, RESET);
        }
    }
    false
}

fn print_help() {
    println!();
    println!("{}Commands:{}", BOLD, RESET);
    println!("  {}/help{}, /h, /?   Show this help", CYAN, RESET);
    println!("  {}/tools{}          List available tools", CYAN, RESET);
    println!("  {}/history{}        Show the last query's history", CYAN, RESET);
    println!("  {}/steps{}          Show the last query's completed steps", CYAN, RESET);
    println!("  {}/exit{}, /q       Exit", CYAN, RESET);
    println!();
}
