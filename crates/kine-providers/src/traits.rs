//! LLM Provider trait — the seam between the agent loop and a model backend.
//!
//! The `HttpProvider` in `http_provider.rs` covers all OpenAI-compatible APIs;
//! tests plug in scripted implementations.

use async_trait::async_trait;
use kine_core::types::{LlmResponse, Message};

/// Failure of a single chat completion call.
///
/// The agent loop does not recover from these: they abort the run.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Connection, TLS or timeout failure.
    #[error("Error calling LLM: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("Error calling LLM: {status} — {body}")]
    Api { status: u16, body: String },

    /// The response body was not a chat completion.
    #[error("Error parsing LLM response: {0}")]
    Decode(String),

    /// Provider could not be constructed from its configuration.
    #[error("Invalid provider configuration: {0}")]
    Config(String),
}

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// # Arguments
    /// * `messages` — Conversation in OpenAI format.
    /// * `model`    — Model identifier (e.g. `"gpt-4o-mini"`).
    async fn chat_completion(
        &self,
        messages: &[Message],
        model: &str,
    ) -> Result<LlmResponse, ProviderError>;

    /// Display name for logging.
    fn display_name(&self) -> &str {
        "llm"
    }
}
