//! Shared CLI helpers — path expansion, result printing, version banner.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;

use kine_agent::{RunResult, Step, StepKind};
use kine_core::utils::truncate_string;

/// How a finished run is printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// The answer plus a one-line summary.
    #[default]
    Answer,
    /// Boxed report with every step.
    Report,
    /// The full result as JSON.
    Json,
}

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Print a finished run to stdout.
pub fn print_result(result: &RunResult, mode: OutputMode) -> Result<()> {
    match mode {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputMode::Report => println!("{}", result.beautify()),
        OutputMode::Answer => {
            println!();
            println!("{}", "Kine".cyan().bold());
            if result.final_answer().is_empty() {
                println!("{}", "(no response)".dimmed());
            } else {
                println!("{}", result.final_answer());
            }
            let usage = result.usage();
            println!(
                "{}",
                format!(
                    "{} steps · {} tokens · {} ms",
                    result.steps().len().saturating_sub(1),
                    usage.total_tokens,
                    usage.total_latency_ms
                )
                .dimmed()
            );
            println!();
        }
    }
    Ok(())
}

/// One line per streamed step.
pub fn print_step(step: &Step) {
    let action = step.action.as_deref().unwrap_or("-");
    let label = match step.kind {
        StepKind::Agent => format!("[{}]", step.kind).green(),
        StepKind::Tool => format!("[{}]", step.kind).blue(),
        StepKind::Error => format!("[{}]", step.kind).red(),
    };
    println!(
        "  {} {} {}",
        label,
        action.bold(),
        truncate_string(&step.thought, 80).dimmed()
    );
    if step.kind == StepKind::Error {
        if let Some(text) = step.result_text() {
            println!("      {}", truncate_string(&text, 120).red());
        }
    }
}

/// Print the banner shown at REPL start.
pub fn print_banner(agent_id: &str, model: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!(
        "{}  v{}  {}",
        "Kine".cyan().bold(),
        version.dimmed(),
        format!("{agent_id} · {model}").dimmed()
    );
    println!(
        "{}",
        "Type a message, \"/stats\", \"/clear\", or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Print a "thinking" placeholder (for non-log mode).
pub fn print_thinking() {
    eprint!("{}", "thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
