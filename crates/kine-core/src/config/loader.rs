//! Config loader — reads `~/.kine/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.kine/config.json`
//! 3. Legacy env vars `LLM_API_KEY`, `LLM_BASE_URL`, `KINE_DEBUG`
//! 4. Environment variables `KINE_<SECTION>__<FIELD>` (override everything)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    apply_env_overrides(load_config_from_path(&config_path))
}

/// Load config from a specific file path (no env overrides).
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Supported overrides:
/// - `LLM_API_KEY` / `KINE_PROVIDER__API_KEY` → `provider.api_key`
/// - `LLM_BASE_URL` / `KINE_PROVIDER__API_BASE` → `provider.api_base`
/// - `KINE_PROVIDER__TIMEOUT_SECS` → `provider.timeout_secs`
/// - `KINE_DEBUG` / `KINE_AGENT__DEBUG` → `agent.debug`
/// - `KINE_AGENT__ID` → `agent.id`
/// - `KINE_AGENT__MODEL` → `agent.model`
/// - `KINE_AGENT__MAX_STEPS` → `agent.max_steps`
/// - `KINE_MEMORY__MAX_MESSAGES` → `memory.max_messages`
/// - `KINE_MEMORY__MAX_STEPS` → `memory.max_steps`
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Override logic, parameterised over the variable lookup so it can be tested
/// without touching the process environment.
fn apply_overrides(mut config: Config, var: impl Fn(&str) -> Option<String>) -> Config {
    // Legacy names first so the namespaced ones win.
    if let Some(val) = var("LLM_API_KEY") {
        config.provider.api_key = val;
    }
    if let Some(val) = var("LLM_BASE_URL") {
        config.provider.api_base = Some(val);
    }
    if let Some(val) = var("KINE_DEBUG") {
        config.agent.debug = is_truthy(&val);
    }

    // Agent
    if let Some(val) = var("KINE_AGENT__ID") {
        config.agent.id = val;
    }
    if let Some(val) = var("KINE_AGENT__MODEL") {
        config.agent.model = val;
    }
    if let Some(n) = var("KINE_AGENT__MAX_STEPS").and_then(|v| v.parse::<usize>().ok()) {
        config.agent.max_steps = n;
    }
    if let Some(val) = var("KINE_AGENT__DEBUG") {
        config.agent.debug = is_truthy(&val);
    }

    // Provider
    if let Some(val) = var("KINE_PROVIDER__API_KEY") {
        config.provider.api_key = val;
    }
    if let Some(val) = var("KINE_PROVIDER__API_BASE") {
        config.provider.api_base = Some(val);
    }
    if let Some(n) = var("KINE_PROVIDER__TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
        config.provider.timeout_secs = n;
    }

    // Memory
    if let Some(n) = var("KINE_MEMORY__MAX_MESSAGES").and_then(|v| v.parse::<usize>().ok()) {
        config.memory.max_messages = n;
    }
    if let Some(n) = var("KINE_MEMORY__MAX_STEPS").and_then(|v| v.parse::<usize>().ok()) {
        config.memory.max_steps = n;
    }

    config
}

fn is_truthy(val: &str) -> bool {
    val == "true" || val == "1"
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
