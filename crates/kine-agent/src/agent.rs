//! Agent facade — builder, tool registration and the run entry points.
//!
//! An [`Agent`] owns its tool registry, its conversation (step tracker plus
//! optional shared memory) and a `tracing` span tagged with the agent id.
//! Runs take `&mut self`: one agent never executes two runs at once.

use std::sync::Arc;

use futures::Stream;
use tracing::{info_span, Instrument, Span};

use kine_core::config::AgentConfig;
use kine_providers::LlmProvider;

use crate::conversation::Conversation;
use crate::error::AgentError;
use crate::execution_loop::{ExecutionLoop, RunEvent};
use crate::executor::StepExecutor;
use crate::memory::Memory;
use crate::prompt::SystemPromptBuilder;
use crate::response::{ResponseFormatter, TaggedFormatter};
use crate::result::RunResult;
use crate::tools::{Tool, ToolRegistry};

/// Step budget when none is configured.
pub const DEFAULT_MAX_STEPS: usize = 10;

// ─────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────

pub struct AgentBuilder {
    id: Option<String>,
    description: Option<String>,
    model: Option<String>,
    max_steps: usize,
    memory: Option<Arc<dyn Memory>>,
    tools: Vec<Arc<dyn Tool>>,
    provider: Option<Arc<dyn LlmProvider>>,
    formatter: Option<Arc<dyn ResponseFormatter>>,
    debug: bool,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self {
            id: None,
            description: None,
            model: None,
            max_steps: DEFAULT_MAX_STEPS,
            memory: None,
            tools: Vec::new(),
            provider: None,
            formatter: None,
            debug: false,
        }
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed id, description, model, budget and debug flag from config.
    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new()
            .id(&config.id)
            .model(&config.model)
            .max_steps(config.max_steps)
            .debug(config.debug)
            .description_opt(config.description.clone())
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn description_opt(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Response formatter; tagged by default.
    pub fn formatter(mut self, formatter: Arc<dyn ResponseFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Log raw and parsed model responses at debug level.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn build(self) -> Result<Agent, AgentError> {
        let id = self
            .id
            .filter(|s| !s.trim().is_empty())
            .ok_or(AgentError::MissingField("id"))?;
        let model = self
            .model
            .filter(|s| !s.trim().is_empty())
            .ok_or(AgentError::MissingField("model"))?;
        let provider = self.provider.ok_or(AgentError::MissingField("provider"))?;
        let formatter = self
            .formatter
            .unwrap_or_else(|| Arc::new(TaggedFormatter));

        let mut tools = ToolRegistry::new();
        for tool in self.tools {
            tools.register(tool);
        }

        let span = info_span!("agent", agent_id = %id);
        span.in_scope(|| {
            tracing::debug!(
                model = %model,
                max_steps = self.max_steps,
                tools = tools.len(),
                memory = self.memory.is_some(),
                "agent created"
            );
        });

        Ok(Agent {
            prompt: SystemPromptBuilder::new(&id, self.description),
            executor: StepExecutor::new(provider, formatter, &model, self.debug),
            conversation: Conversation::new(self.max_steps, self.memory),
            tools,
            id,
            span,
        })
    }
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

pub struct Agent {
    id: String,
    prompt: SystemPromptBuilder,
    executor: StepExecutor,
    conversation: Conversation,
    tools: ToolRegistry,
    span: Span,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &str {
        self.executor.model()
    }

    pub fn description(&self) -> &str {
        self.prompt.description()
    }

    pub fn max_steps(&self) -> usize {
        self.conversation.max_steps()
    }

    pub fn memory(&self) -> Option<&Arc<dyn Memory>> {
        self.conversation.memory()
    }

    /// Add (or replace) a tool. Takes effect from the next run.
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.register(tool);
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The system prompt for the current tool set.
    pub fn system_prompt(&self) -> String {
        self.prompt.build(&self.tools.describe())
    }

    /// Run a task to completion.
    ///
    /// Provider failures abort the run; every other failure is recorded as
    /// an error step and the loop continues.
    pub async fn run(&mut self, prompt: &str) -> Result<RunResult, AgentError> {
        let system_prompt = self.system_prompt();
        let span = self.span.clone();
        ExecutionLoop::new(
            &self.executor,
            &mut self.conversation,
            &self.tools,
            system_prompt,
            prompt.to_string(),
        )
        .run()
        .instrument(span)
        .await
    }

    /// Run a task, yielding each recorded step followed by the result.
    ///
    /// Nothing happens until the stream is polled, and each poll advances
    /// the loop by at most one step. A provider failure ends the stream
    /// with an `Err` item.
    pub fn run_streaming(
        &mut self,
        prompt: &str,
    ) -> impl Stream<Item = Result<RunEvent, AgentError>> + '_ {
        let task = prompt.to_string();
        let system_prompt = self.system_prompt();
        let span = self.span.clone();

        async_stream::stream! {
            let mut lp = ExecutionLoop::new(
                &self.executor,
                &mut self.conversation,
                &self.tools,
                system_prompt,
                task,
            );
            span.in_scope(|| lp.begin());

            loop {
                match lp.advance().instrument(span.clone()).await {
                    Ok(Some(step)) => {
                        yield Ok(RunEvent::Step(step));
                    }
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            let result = span.in_scope(|| lp.finish());
            yield Ok(RunEvent::Completed(result));
        }
    }
}
