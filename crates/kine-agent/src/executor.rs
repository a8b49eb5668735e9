//! Step executor — one THINK → ACT iteration.
//!
//! Composes the message list, calls the provider, runs the response through
//! the formatter, and dispatches tool calls. Recording the step is left to
//! the execution loop.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, warn};

use kine_core::types::Message;
use kine_providers::{LlmProvider, ProviderError};

use crate::conversation::Conversation;
use crate::response::ResponseFormatter;
use crate::steps::{LlmCallMetadata, StepKind, StepOutput};
use crate::tools::ToolRegistry;

pub struct StepExecutor {
    provider: Arc<dyn LlmProvider>,
    formatter: Arc<dyn ResponseFormatter>,
    model: String,
    debug: bool,
}

impl StepExecutor {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        formatter: Arc<dyn ResponseFormatter>,
        model: impl Into<String>,
        debug: bool,
    ) -> Self {
        Self {
            provider,
            formatter,
            model: model.into(),
            debug,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one iteration. Only provider failures are errors; everything
    /// else comes back as a step output.
    pub async fn execute_step(
        &self,
        system_prompt: &str,
        task: &str,
        conversation: &Conversation,
        tools: &ToolRegistry,
    ) -> Result<StepOutput, ProviderError> {
        let messages = Self::prepare_messages(system_prompt, task, conversation);
        let (content, metadata) = self.call_llm(&messages).await?;
        let output = self.parse_and_validate(&content, &tools.tool_names(), metadata);

        if output.kind == StepKind::Tool && output.action.is_some() {
            return Ok(Self::run_tool(output, tools).await);
        }
        Ok(output)
    }

    /// `[system, memory history…, user task, run history…]`
    pub fn prepare_messages(
        system_prompt: &str,
        task: &str,
        conversation: &Conversation,
    ) -> Vec<Message> {
        let mut messages = vec![Message::system(system_prompt)];
        messages.extend(conversation.memory_history(task));
        messages.push(Message::user(task));
        messages.extend(conversation.build_history());
        messages
    }

    async fn call_llm(
        &self,
        messages: &[Message],
    ) -> Result<(String, LlmCallMetadata), ProviderError> {
        let started = Instant::now();
        let response = self
            .provider
            .chat_completion(messages, &self.model)
            .await?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if self.debug {
            debug!(
                provider = self.provider.display_name(),
                latency_ms,
                raw = %response.content,
                "raw LLM response"
            );
        }

        let metadata = LlmCallMetadata {
            latency_ms,
            model: response.model,
            tokens: response.usage,
            finish_reason: response.finish_reason,
        };
        Ok((response.content, metadata))
    }

    fn parse_and_validate(
        &self,
        content: &str,
        tool_names: &[String],
        metadata: LlmCallMetadata,
    ) -> StepOutput {
        match self.formatter.parse(content, tool_names) {
            Ok(parsed) => {
                if self.debug {
                    debug!(
                        action = parsed.action.as_deref().unwrap_or("-"),
                        "parsed LLM response"
                    );
                }
                let validation = self.formatter.validate(&parsed);
                if let Err(e) = &validation {
                    warn!(error = %e, "LLM response failed validation");
                }
                self.formatter
                    .to_step_output(parsed, validation, Some(metadata))
            }
            Err(e) => {
                warn!(error = %e, "LLM response could not be parsed");
                self.formatter.format_error(&e, Some(metadata))
            }
        }
    }

    /// Dispatch a pending tool step. Success fills in the result; failure
    /// turns the step into an error carrying the dispatch message.
    async fn run_tool(output: StepOutput, tools: &ToolRegistry) -> StepOutput {
        let Some(action) = output.action.as_deref() else {
            return output;
        };

        match tools.dispatch(action, output.parameter.as_ref()).await {
            Ok(result) => StepOutput {
                result: Some(result),
                ..output
            },
            Err(failure) => StepOutput {
                kind: StepKind::Error,
                result: Some(serde_json::Value::String(failure.to_string())),
                parameter: failure.parameter.or(output.parameter),
                ..output
            },
        }
    }
}
