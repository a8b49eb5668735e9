//! Execution loop — drives step iterations until finalize or budget.
//!
//! ```text
//! begin ──► advance ──► advance ──► … ──► finish
//!              │ Running    │ Finalized / TimedOut
//!              ▼            ▼
//!         Some(step)      None
//! ```
//!
//! `advance` records exactly one step per call, so the same state machine
//! backs both [`ExecutionLoop::run`] and the streaming API.

use tracing::{debug, info};

use crate::conversation::Conversation;
use crate::error::AgentError;
use crate::executor::StepExecutor;
use crate::result::RunResult;
use crate::steps::Step;
use crate::tools::ToolRegistry;

/// Where a run stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Finalized(String),
    TimedOut,
}

/// Item of a streamed run: each recorded step, then the result.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    Step(Step),
    Completed(RunResult),
}

pub struct ExecutionLoop<'a> {
    executor: &'a StepExecutor,
    conversation: &'a mut Conversation,
    tools: &'a ToolRegistry,
    system_prompt: String,
    task: String,
    state: LoopState,
}

impl<'a> ExecutionLoop<'a> {
    pub fn new(
        executor: &'a StepExecutor,
        conversation: &'a mut Conversation,
        tools: &'a ToolRegistry,
        system_prompt: String,
        task: String,
    ) -> Self {
        Self {
            executor,
            conversation,
            tools,
            system_prompt,
            task,
            state: LoopState::Running,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Reset the tracker and post the task to memory.
    pub fn begin(&mut self) {
        self.conversation.initialize();
        self.conversation.add_user_message(&self.task);
        self.state = LoopState::Running;
        info!(
            max_steps = self.conversation.max_steps(),
            tools = self.tools.len(),
            "run started"
        );
    }

    /// Run one iteration and return the recorded step, or `None` once the
    /// loop has left `Running`.
    pub async fn advance(&mut self) -> Result<Option<Step>, AgentError> {
        if self.state != LoopState::Running {
            return Ok(None);
        }
        if self.conversation.has_reached_max() {
            self.state = LoopState::TimedOut;
            return Ok(None);
        }

        let output = self
            .executor
            .execute_step(&self.system_prompt, &self.task, &*self.conversation, self.tools)
            .await?;
        let step = self.conversation.add_step(output);

        if step.is_finalize() {
            self.state = LoopState::Finalized(step.result_text().unwrap_or_default());
            return Ok(Some(step));
        }

        if self.conversation.is_eroded(&step) {
            self.conversation.increment_context_switches();
            debug!(
                context_switches = self.conversation.tracker().context_switches(),
                "context switch detected"
            );
        }
        if self.conversation.has_reached_max() {
            self.state = LoopState::TimedOut;
        }
        Ok(Some(step))
    }

    /// Post the answer to memory and assemble the result.
    pub fn finish(self) -> RunResult {
        let timed_out = !matches!(self.state, LoopState::Finalized(_));
        let answer = match self.state {
            LoopState::Finalized(answer) => answer,
            LoopState::Running | LoopState::TimedOut => format!(
                "Agent timed out (max {} steps).",
                self.conversation.max_steps()
            ),
        };

        self.conversation.add_assistant_message(&answer);
        let result = RunResult::new(answer, self.conversation.tracker().trace());

        info!(
            steps = self.conversation.tracker().step_count(),
            timed_out,
            total_tokens = result.usage().total_tokens,
            "run finished"
        );
        result
    }

    /// Drive the loop to completion.
    pub async fn run(mut self) -> Result<RunResult, AgentError> {
        self.begin();
        while self.advance().await?.is_some() {}
        Ok(self.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::TaggedFormatter;
    use crate::steps::StepKind;
    use async_trait::async_trait;
    use kine_core::types::{LlmResponse, Message};
    use kine_providers::{LlmProvider, ProviderError};
    use std::sync::Arc;

    struct Scripted(std::sync::Mutex<Vec<&'static str>>);

    #[async_trait]
    impl LlmProvider for Scripted {
        async fn chat_completion(
            &self,
            _messages: &[Message],
            _model: &str,
        ) -> Result<LlmResponse, ProviderError> {
            let mut replies = self.0.lock().unwrap();
            let text = if replies.is_empty() { "" } else { replies.remove(0) };
            Ok(LlmResponse::text(text, "mock"))
        }
    }

    fn executor(replies: Vec<&'static str>) -> StepExecutor {
        StepExecutor::new(
            Arc::new(Scripted(std::sync::Mutex::new(replies))),
            Arc::new(TaggedFormatter),
            "mock",
            false,
        )
    }

    const FINAL: &str =
        "<thought>done</thought><action>finalize</action><final_answer>42</final_answer>";

    #[tokio::test]
    async fn test_finalize_on_first_step() {
        let exec = executor(vec![FINAL]);
        let tools = ToolRegistry::new();
        let mut conv = Conversation::new(3, None);

        let result = ExecutionLoop::new(&exec, &mut conv, &tools, "sys".into(), "q".into())
            .run()
            .await
            .unwrap();

        assert_eq!(result.final_answer(), "42");
        assert_eq!(result.steps().len(), 2);
        assert_eq!(result.steps()[0].thought, "Agent task started by user");
    }

    #[tokio::test]
    async fn test_advance_stops_at_budget() {
        let exec = executor(vec!["?", "?", FINAL]);
        let tools = ToolRegistry::new();
        let mut conv = Conversation::new(2, None);

        let mut lp = ExecutionLoop::new(&exec, &mut conv, &tools, "sys".into(), "q".into());
        lp.begin();
        let first = lp.advance().await.unwrap().unwrap();
        assert_eq!(first.kind, StepKind::Error);
        assert_eq!(lp.state(), &LoopState::Running);
        assert!(lp.advance().await.unwrap().is_some());
        assert_eq!(lp.state(), &LoopState::TimedOut);
        assert!(lp.advance().await.unwrap().is_none());

        let result = lp.finish();
        assert_eq!(result.final_answer(), "Agent timed out (max 2 steps).");
    }

    #[tokio::test]
    async fn test_zero_budget_times_out_without_calls() {
        let exec = executor(vec![FINAL]);
        let tools = ToolRegistry::new();
        let mut conv = Conversation::new(0, None);

        let result = ExecutionLoop::new(&exec, &mut conv, &tools, "sys".into(), "q".into())
            .run()
            .await
            .unwrap();
        assert_eq!(result.final_answer(), "Agent timed out (max 0 steps).");
        assert_eq!(result.steps().len(), 1);
        assert_eq!(result.usage().llm_calls, 0);
    }

    #[tokio::test]
    async fn test_finalize_with_blank_answer_keeps_running() {
        let exec = executor(vec![
            "<thought>t</thought><action>finalize</action><final_answer> </final_answer>",
            FINAL,
        ]);
        let tools = ToolRegistry::new();
        let mut conv = Conversation::new(5, None);

        let result = ExecutionLoop::new(&exec, &mut conv, &tools, "sys".into(), "q".into())
            .run()
            .await
            .unwrap();

        assert_eq!(result.final_answer(), "42");
        let error = &result.steps()[1];
        assert_eq!(error.kind, StepKind::Error);
        assert_eq!(error.action.as_deref(), Some("finalize"));
    }
}
