//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentConfig`, `ProviderConfig`, `MemoryConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.kine/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentConfig,
    pub provider: ProviderConfig,
    pub memory: MemoryConfig,
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Agent identity and loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Agent identifier, shown to the model and attached to every log line.
    pub id: String,
    /// Free-text description injected into the system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Model identifier sent to the provider.
    pub model: String,
    /// Step budget per run.
    pub max_steps: usize,
    /// Verbose step logging.
    pub debug: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            id: "kine".to_string(),
            description: None,
            model: "gpt-4o-mini".to_string(),
            max_steps: 10,
            debug: false,
        }
    }
}

// ─────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for Bearer authentication.
    pub api_key: String,
    /// Custom API base URL (defaults to the OpenAI API).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            extra_headers: None,
            timeout_secs: 120,
        }
    }
}

impl ProviderConfig {
    /// Whether an API key has been configured.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ─────────────────────────────────────────────
// Memory
// ─────────────────────────────────────────────

/// Limits for the in-process conversation memory.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryConfig {
    /// Messages kept before the oldest are evicted.
    pub max_messages: usize,
    /// Steps kept before the oldest are evicted.
    pub max_steps: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: 1000,
            max_steps: 100,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.agent.id, "kine");
        assert_eq!(config.agent.max_steps, 10);
        assert!(!config.agent.debug);
        assert_eq!(config.provider.timeout_secs, 120);
        assert!(!config.provider.is_configured());
        assert_eq!(config.memory.max_messages, 1000);
        assert_eq!(config.memory.max_steps, 100);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"agent": {"maxSteps": 4}}"#).unwrap();
        assert_eq!(config.agent.max_steps, 4);
        assert_eq!(config.agent.model, "gpt-4o-mini");
        assert_eq!(config.memory.max_steps, 100);
    }

    #[test]
    fn test_camel_case_serialization() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert!(json["agent"].get("maxSteps").is_some());
        assert!(json["provider"].get("timeoutSecs").is_some());
        assert!(json["memory"].get("maxMessages").is_some());
        // Unset optionals are omitted
        assert!(json["provider"].get("apiBase").is_none());
    }
}
