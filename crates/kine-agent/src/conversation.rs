//! Conversation — the step tracker plus the optional memory store.
//!
//! Everything the loop records goes through here so that memory mirrors the
//! tracker: the user prompt, each step (with its 1-based number) and the
//! final answer.

use std::sync::Arc;

use tracing::debug;

use kine_core::types::{Message, Role};

use crate::memory::Memory;
use crate::steps::{Step, StepOutput, StepTracker};

pub struct Conversation {
    tracker: StepTracker,
    memory: Option<Arc<dyn Memory>>,
}

impl Conversation {
    pub fn new(max_steps: usize, memory: Option<Arc<dyn Memory>>) -> Self {
        Self {
            tracker: StepTracker::new(max_steps),
            memory,
        }
    }

    /// Reset the tracker for a new run. Memory is kept.
    pub fn initialize(&mut self) {
        self.tracker.initialize();
    }

    /// Record a step and mirror it into memory. Returns the recorded step.
    pub fn add_step(&mut self, output: StepOutput) -> Step {
        let step = self.tracker.add_step(output).clone();
        let number = self.tracker.step_count();

        if let Some(memory) = &self.memory {
            memory.add_step(&step, number);
        }

        debug!(
            step = number,
            kind = %step.kind,
            action = step.action.as_deref().unwrap_or("-"),
            "step recorded"
        );
        step
    }

    pub fn add_user_message(&self, content: &str) {
        if let Some(memory) = &self.memory {
            memory.add_message(Role::User, content);
        }
    }

    pub fn add_assistant_message(&self, content: &str) {
        if let Some(memory) = &self.memory {
            memory.add_message(Role::Assistant, content);
        }
    }

    /// Earlier turns from memory, minus user messages identical to `task`
    /// (the current prompt is appended separately).
    pub fn memory_history(&self, task: &str) -> Vec<Message> {
        let Some(memory) = &self.memory else {
            return Vec::new();
        };
        memory
            .to_conversation_history()
            .into_iter()
            .filter(|msg| !matches!(msg, Message::User { content } if content == task))
            .collect()
    }

    /// Turns rendered from this run's steps.
    pub fn build_history(&self) -> Vec<Message> {
        self.tracker.build_history()
    }

    pub fn tracker(&self) -> &StepTracker {
        &self.tracker
    }

    pub fn has_reached_max(&self) -> bool {
        self.tracker.has_reached_max()
    }

    pub fn is_eroded(&self, step: &Step) -> bool {
        self.tracker.is_eroded(step)
    }

    pub fn increment_context_switches(&mut self) {
        self.tracker.increment_context_switches();
    }

    pub fn max_steps(&self) -> usize {
        self.tracker.max_steps()
    }

    pub fn memory(&self) -> Option<&Arc<dyn Memory>> {
        self.memory.as_ref()
    }
}
