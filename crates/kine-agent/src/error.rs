//! Errors surfaced to callers of the agent.
//!
//! Parse, validation and tool failures never show up here: they become
//! `Error` steps inside the run. Only construction problems and provider
//! failures abort a run.

use kine_providers::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A required builder field was not set.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The chat completion call failed; the run is aborted.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
