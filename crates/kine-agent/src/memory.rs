//! Conversation memory — what an agent remembers across runs.
//!
//! The loop writes the user prompt, every recorded step, and the final answer
//! through the [`Memory`] trait, and reads earlier turns back via
//! [`Memory::to_conversation_history`] when preparing each model call.
//!
//! [`SimpleMemory`] keeps bounded in-process buffers. Nothing is persisted.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use kine_core::config::MemoryConfig;
use kine_core::types::{Message, Role, ToolCall, UsageInfo};

use crate::steps::{Step, StepKind};

// ─────────────────────────────────────────────
// Memory trait
// ─────────────────────────────────────────────

/// A conversation store shared behind `Arc`; implementations use interior
/// mutability.
pub trait Memory: Send + Sync {
    fn add_message(&self, role: Role, content: &str);

    /// `step_number` is 1-based within its run.
    fn add_step(&self, step: &Step, step_number: usize);

    /// Earlier turns in provider message form.
    fn to_conversation_history(&self) -> Vec<Message>;
}

// ─────────────────────────────────────────────
// Entries
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize)]
pub struct MemoryMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MemoryStep {
    pub step: Step,
    pub step_number: usize,
    pub timestamp: DateTime<Utc>,
}

/// Entry counts by role and step kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub total_messages: usize,
    pub total_steps: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub system_messages: usize,
    pub agent_steps: usize,
    pub tool_steps: usize,
    pub error_steps: usize,
}

// ─────────────────────────────────────────────
// SimpleMemory
// ─────────────────────────────────────────────

#[derive(Default)]
struct MemoryState {
    messages: VecDeque<MemoryMessage>,
    steps: VecDeque<MemoryStep>,
}

/// Bounded in-process memory. Oldest entries are evicted first.
///
/// Thread-safe via `RwLock` — multiple readers, exclusive writer.
pub struct SimpleMemory {
    config: MemoryConfig,
    state: RwLock<MemoryState>,
}

impl SimpleMemory {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            state: RwLock::new(MemoryState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn messages(&self) -> Vec<MemoryMessage> {
        self.read().messages.iter().cloned().collect()
    }

    pub fn steps(&self) -> Vec<MemoryStep> {
        self.read().steps.iter().cloned().collect()
    }

    /// The last `count` messages, oldest first.
    pub fn recent_messages(&self, count: usize) -> Vec<MemoryMessage> {
        let state = self.read();
        let skip = state.messages.len().saturating_sub(count);
        state.messages.iter().skip(skip).cloned().collect()
    }

    /// The last `count` steps, oldest first.
    pub fn recent_steps(&self, count: usize) -> Vec<MemoryStep> {
        let state = self.read();
        let skip = state.steps.len().saturating_sub(count);
        state.steps.iter().skip(skip).cloned().collect()
    }

    pub fn clear_messages(&self) {
        self.write().messages.clear();
    }

    pub fn clear_steps(&self) {
        self.write().steps.clear();
    }

    pub fn clear_all(&self) {
        let mut state = self.write();
        state.messages.clear();
        state.steps.clear();
    }

    pub fn stats(&self) -> MemoryStats {
        let state = self.read();
        let count_role = |role: Role| state.messages.iter().filter(|m| m.role == role).count();
        let count_kind = |kind: StepKind| state.steps.iter().filter(|s| s.step.kind == kind).count();

        MemoryStats {
            total_messages: state.messages.len(),
            total_steps: state.steps.len(),
            user_messages: count_role(Role::User),
            assistant_messages: count_role(Role::Assistant),
            system_messages: count_role(Role::System),
            agent_steps: count_kind(StepKind::Agent),
            tool_steps: count_kind(StepKind::Tool),
            error_steps: count_kind(StepKind::Error),
        }
    }

    /// Token totals over every remembered step that carries usage.
    pub fn token_usage(&self) -> UsageInfo {
        self.read()
            .steps
            .iter()
            .filter_map(|s| s.step.meta.tokens)
            .fold(UsageInfo::default(), |acc, t| UsageInfo {
                prompt_tokens: acc.prompt_tokens + t.prompt_tokens,
                completion_tokens: acc.completion_tokens + t.completion_tokens,
                total_tokens: acc.total_tokens + t.total_tokens,
            })
    }
}

impl Default for SimpleMemory {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl Memory for SimpleMemory {
    fn add_message(&self, role: Role, content: &str) {
        let mut state = self.write();
        state.messages.push_back(MemoryMessage {
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        });
        while state.messages.len() > self.config.max_messages {
            state.messages.pop_front();
        }
        debug!(role = %role, messages = state.messages.len(), "memory: message added");
    }

    fn add_step(&self, step: &Step, step_number: usize) {
        let mut state = self.write();
        state.steps.push_back(MemoryStep {
            step: step.clone(),
            step_number,
            timestamp: Utc::now(),
        });
        while state.steps.len() > self.config.max_steps {
            state.steps.pop_front();
        }
    }

    /// Messages and steps merged by timestamp, starting with the first
    /// message when it is from the user. Only tool steps with an action and
    /// a parameter are replayed, as a tool call plus its result.
    fn to_conversation_history(&self) -> Vec<Message> {
        let state = self.read();
        let mut history = Vec::new();

        let mut messages = state.messages.iter().peekable();
        let mut steps = state.steps.iter().peekable();

        if let Some(first) = messages.next_if(|m| m.role == Role::User) {
            history.push(Message::user(&first.content));
        }

        loop {
            let take_step = match (steps.peek(), messages.peek()) {
                (Some(step), Some(msg)) => step.timestamp <= msg.timestamp,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };

            if take_step {
                if let Some(step) = steps.next() {
                    push_step(&mut history, step);
                }
            } else if let Some(msg) = messages.next() {
                history.push(Message::with_role(msg.role, &msg.content));
            }
        }

        history
    }
}

fn push_step(history: &mut Vec<Message>, entry: &MemoryStep) {
    let step = &entry.step;
    if step.kind != StepKind::Tool {
        return;
    }
    let (Some(action), Some(parameter)) = (&step.action, &step.parameter) else {
        return;
    };
    if parameter.is_null() {
        return;
    }

    let call_id = format!("call_{}", entry.step_number);
    history.push(Message::assistant_tool_calls(vec![ToolCall::new(
        &call_id,
        action,
        parameter.to_string(),
    )]));

    let content = match &step.result {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    history.push(Message::tool_result(call_id, content));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
