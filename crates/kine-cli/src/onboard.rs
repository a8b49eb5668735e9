//! `kine onboard` — write the default configuration.
//!
//! Creates `~/.kine/config.json` (or the `--config` path) with defaults and
//! the history directory used by the REPL.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use kine_core::config::{get_config_path, save_config, Config};
use kine_core::utils::get_data_path;

/// Run the onboard command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    println!();
    println!("{}", "Kine — Setup".cyan().bold());
    println!();

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    if write_default_config(&config_path)? {
        println!("  {} created config at {}", "✓".green(), config_path.display());
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    }

    let history_dir = get_data_path().join("history");
    std::fs::create_dir_all(&history_dir)
        .with_context(|| format!("failed to create {}", history_dir.display()))?;
    println!("  {} history dir at {}", "✓".green(), history_dir.display());

    println!();
    println!(
        "{}",
        "  Setup complete! Set provider.apiKey (or LLM_API_KEY), then run `kine agent`.".green()
    );
    println!();

    Ok(())
}

/// Write a default config unless one exists. Returns whether it was written.
fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
