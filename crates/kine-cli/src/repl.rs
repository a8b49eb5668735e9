//! Interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history. All
//! tasks in a session share one memory store.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use kine_agent::{Agent, SimpleMemory};

use crate::{helpers, run_task, RunOptions};

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// What a line of input asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Exit,
    Clear,
    Stats,
    Task(&'a str),
}

fn classify(line: &str) -> Option<Input<'_>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();
    Some(match lower.as_str() {
        l if EXIT_COMMANDS.contains(&l) => Input::Exit,
        "/clear" => Input::Clear,
        "/stats" => Input::Stats,
        _ => Input::Task(trimmed),
    })
}

/// Run the interactive REPL loop.
pub async fn run(mut agent: Agent, memory: Arc<SimpleMemory>, options: RunOptions) -> Result<()> {
    helpers::print_banner(agent.id(), agent.model());

    let mut editor = create_editor()?;

    loop {
        let line = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let Some(input) = classify(&line) else {
            continue;
        };
        let _ = editor.add_history_entry(line.as_str());

        match input {
            Input::Exit => {
                println!("\nGoodbye!");
                break;
            }
            Input::Clear => {
                memory.clear_all();
                println!("{}", "memory cleared".dimmed());
            }
            Input::Stats => print_stats(&memory),
            Input::Task(task) => {
                debug!(input = task, "processing input");
                if !options.stream {
                    helpers::print_thinking();
                }
                let outcome = run_task(&mut agent, task, options).await;
                if !options.stream {
                    helpers::clear_thinking();
                }
                if let Err(e) = outcome {
                    eprintln!("\n{} {e:#}\n", "Error:".red().bold());
                }
            }
        }
    }

    save_history(&mut editor);
    Ok(())
}

fn print_stats(memory: &SimpleMemory) {
    let stats = memory.stats();
    let usage = memory.token_usage();
    println!(
        "  messages: {} (user {}, assistant {})",
        stats.total_messages, stats.user_messages, stats.assistant_messages
    );
    println!(
        "  steps:    {} (agent {}, tool {}, error {})",
        stats.total_steps, stats.agent_steps, stats.tool_steps, stats.error_steps
    );
    println!(
        "  tokens:   {} (prompt {}, completion {})",
        usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
    );
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> std::path::PathBuf {
    kine_core::utils::get_data_path().join("history").join("cli_history")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
