//! `kine status` — show the resolved configuration.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use kine_core::config::{get_config_path, load_config, Config};
use kine_providers::HttpProvider;

/// Run the status command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);
    let config = load_config(Some(&path));

    println!();
    println!("{}", "Kine Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        path.display(),
        if path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );

    for (label, value) in agent_rows(&config) {
        println!("  {:<18} {}", label.bold(), value);
    }

    println!();
    println!("  {}", "Provider:".bold());
    let endpoint = match HttpProvider::new(&config.provider) {
        Ok(provider) => provider.completions_url(),
        Err(e) => format!("{} {e}", "invalid:".red()),
    };
    println!("    {:<16} {}", "Endpoint", endpoint);
    let key_status = if config.provider.is_configured() {
        format!("{} (key set)", "✓".green())
    } else {
        format!("{}", "· not configured".dimmed())
    };
    println!("    {:<16} {}", "API key", key_status);
    println!(
        "    {:<16} {}s",
        "Timeout", config.provider.timeout_secs
    );
    let headers = config.provider.extra_headers.as_ref().map_or(0, |h| h.len());
    if headers > 0 {
        println!("    {:<16} {}", "Extra headers", headers);
    }

    println!();
    println!(
        "  {:<18} {} messages · {} steps",
        "Memory limits:".bold(),
        config.memory.max_messages,
        config.memory.max_steps
    );
    println!();

    Ok(())
}

fn agent_rows(config: &Config) -> Vec<(&'static str, String)> {
    let agent = &config.agent;
    vec![
        ("Agent:", agent.id.clone()),
        (
            "Description:",
            agent
                .description
                .clone()
                .unwrap_or_else(|| kine_agent::prompt::DEFAULT_DESCRIPTION.to_string()),
        ),
        ("Model:", agent.model.clone()),
        ("Max steps:", agent.max_steps.to_string()),
        ("Debug:", agent.debug.to_string()),
    ]
}
