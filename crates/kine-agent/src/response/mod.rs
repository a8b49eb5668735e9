//! Response handling — turning raw model text into a step.
//!
//! The loop only talks to the [`ResponseFormatter`] trait:
//! `parse` → `validate` → `to_step_output`, with `format_error` for text
//! that cannot be parsed at all.

pub mod formatter;
pub mod parser;

use serde_json::Value;

use crate::steps::{LlmCallMetadata, StepKind, StepOutput, FINALIZE, PENDING};

pub use formatter::{PlainTextFormatter, TaggedFormatter};

// ─────────────────────────────────────────────
// Parsed decision
// ─────────────────────────────────────────────

/// What the model decided, as far as the parser could tell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedDecision {
    pub thought: Option<String>,
    pub action: Option<String>,
    pub parameter: Option<Value>,
    pub final_answer: Option<String>,
}

// ─────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────

/// The response could not be parsed at all.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("response is empty")]
    EmptyResponse,
}

/// The response parsed but is structurally incomplete.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("LLM response missing 'action' tag")]
    MissingAction,

    #[error("final_answer cannot be empty. Provide a substantive response with <final_answer> tag.")]
    EmptyFinalAnswer,
}

// ─────────────────────────────────────────────
// ResponseFormatter
// ─────────────────────────────────────────────

/// A response format the agent can speak.
///
/// Only `parse` differs between formats; validation and step construction
/// have shared defaults.
pub trait ResponseFormatter: Send + Sync {
    /// Parse raw model text. `tool_names` feeds the plain-text heuristic.
    fn parse(&self, raw: &str, tool_names: &[String]) -> Result<ParsedDecision, FormatError>;

    fn validate(&self, parsed: &ParsedDecision) -> Result<(), ValidationError> {
        let action = parsed.action.as_deref().unwrap_or("");
        if action.is_empty() {
            return Err(ValidationError::MissingAction);
        }
        if action == FINALIZE
            && parsed
                .final_answer
                .as_deref()
                .map_or(true, |a| a.trim().is_empty())
        {
            return Err(ValidationError::EmptyFinalAnswer);
        }
        Ok(())
    }

    fn to_step_output(
        &self,
        parsed: ParsedDecision,
        validation: Result<(), ValidationError>,
        llm: Option<LlmCallMetadata>,
    ) -> StepOutput {
        if let Err(e) = validation {
            return StepOutput {
                kind: StepKind::Error,
                thought: parsed
                    .thought
                    .unwrap_or_else(|| "Validation error".to_string()),
                action: parsed.action,
                parameter: parsed.parameter,
                result: Some(Value::String(e.to_string())),
                llm,
            };
        }

        if parsed.action.as_deref() == Some(FINALIZE) {
            return StepOutput {
                kind: StepKind::Agent,
                thought: parsed.thought.unwrap_or_default(),
                action: parsed.action,
                parameter: parsed.parameter,
                result: parsed.final_answer.map(Value::String),
                llm,
            };
        }

        StepOutput {
            kind: StepKind::Tool,
            thought: parsed.thought.unwrap_or_default(),
            action: parsed.action,
            parameter: parsed.parameter,
            result: Some(Value::String(PENDING.to_string())),
            llm,
        }
    }

    /// Step for a response that could not be parsed: asks the model to retry.
    fn format_error(&self, error: &FormatError, llm: Option<LlmCallMetadata>) -> StepOutput {
        StepOutput {
            kind: StepKind::Error,
            thought: "Invalid format".to_string(),
            action: None,
            parameter: None,
            result: Some(Value::String(format!(
                "Invalid format: {error}. Respond again using the required tags: \
                 <thought>, <action>, <parameter>, and <final_answer> when the action is '{FINALIZE}'."
            ))),
            llm,
        }
    }
}
