//! Kine CLI — entry point.
//!
//! # Commands
//!
//! - `kine agent [-m MESSAGE] [--stream] [--json] [--logs]` — run a task
//!   (single-shot or REPL)
//! - `kine onboard` — write the default config
//! - `kine status` — show the resolved configuration

mod helpers;
mod onboard;
mod repl;
mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing::{info, warn};

use kine_agent::{Agent, AgentBuilder, CalculatorTool, RunEvent, SimpleMemory};
use kine_core::config::{load_config, Config};
use kine_providers::HttpProvider;

use helpers::OutputMode;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Kine — a ReAct agent runner for OpenAI-compatible models
#[derive(Parser)]
#[command(name = "kine", version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.kine/config.json)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task with the agent (single-shot or interactive REPL)
    Agent {
        /// Single task (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Print each step as it is recorded
        #[arg(long, default_value_t = false)]
        stream: bool,

        /// Print the full run result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Print every step after the answer
        #[arg(long, default_value_t = false, conflicts_with = "json")]
        report: bool,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,

        /// Override the configured step budget
        #[arg(long)]
        max_steps: Option<usize>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Write the default configuration
    Onboard,

    /// Show the resolved configuration
    Status,
}

/// Options shared by single-shot and REPL runs.
#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    pub stream: bool,
    pub output: OutputMode,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path: Option<PathBuf> = cli.config.as_deref().map(helpers::expand_tilde);

    match cli.command {
        Commands::Agent {
            message,
            stream,
            json,
            report,
            model,
            max_steps,
            logs,
        } => {
            let mut config = load_config(config_path.as_deref());
            if let Some(model) = model {
                config.agent.model = model;
            }
            if let Some(max_steps) = max_steps {
                config.agent.max_steps = max_steps;
            }
            init_logging(logs || config.agent.debug);

            let output = if json {
                OutputMode::Json
            } else if report {
                OutputMode::Report
            } else {
                OutputMode::Answer
            };
            run_agent(&config, message, RunOptions { stream, output }).await
        }
        Commands::Onboard => onboard::run(config_path.as_deref()),
        Commands::Status => status::run(config_path.as_deref()),
    }
}

// ─────────────────────────────────────────────
// Agent command
// ─────────────────────────────────────────────

async fn run_agent(config: &Config, message: Option<String>, options: RunOptions) -> Result<()> {
    let memory = Arc::new(SimpleMemory::new(config.memory.clone()));
    let mut agent = build_agent(config, memory.clone())?;

    match message {
        Some(msg) => {
            info!(agent = agent.id(), "running single task");
            run_task(&mut agent, &msg, options).await?;
        }
        None => {
            repl::run(agent, memory, options).await?;
        }
    }

    Ok(())
}

/// Build an `Agent` from the loaded configuration.
pub fn build_agent(config: &Config, memory: Arc<SimpleMemory>) -> Result<Agent> {
    if !config.provider.is_configured() {
        warn!("no API key configured; run `kine onboard` and set provider.apiKey");
    }

    let provider =
        HttpProvider::new(&config.provider).context("failed to create LLM provider")?;

    let agent = AgentBuilder::from_config(&config.agent)
        .provider(Arc::new(provider))
        .memory(memory)
        .tool(Arc::new(CalculatorTool))
        .build()
        .context("invalid agent configuration")?;

    Ok(agent)
}

/// Run one task and print the outcome.
pub async fn run_task(agent: &mut Agent, task: &str, options: RunOptions) -> Result<()> {
    if !options.stream {
        let result = agent.run(task).await.context("agent run failed")?;
        return helpers::print_result(&result, options.output);
    }

    let events = agent.run_streaming(task);
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        match event.context("agent run failed")? {
            RunEvent::Step(step) => helpers::print_step(&step),
            RunEvent::Completed(result) => helpers::print_result(&result, options.output)?,
        }
    }
    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("kine=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
