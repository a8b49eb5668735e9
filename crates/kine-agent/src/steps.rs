//! Step tracking — the ordered history of one run.
//!
//! Each loop iteration produces a [`StepOutput`] (what the parser, validator
//! and dispatcher concluded). The [`StepTracker`] freezes it into a [`Step`],
//! stamping the current context-switch count and the LLM call metadata, and
//! renders the history back into conversation turns for the next model call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use kine_core::types::{Message, UsageInfo};

/// Action name that ends a run.
pub const FINALIZE: &str = "finalize";

/// Transient result of a tool step before dispatch completes.
pub const PENDING: &str = "pending";

/// Results that mark a step as having lost track of the task.
const EROSION_SENTINELS: [&str; 5] = [
    PENDING,
    "Tool not found",
    "Tool execution failed",
    "No action provided",
    "GPT skipped 'action'",
];

// ─────────────────────────────────────────────
// Step types
// ─────────────────────────────────────────────

/// What kind of outcome a step represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Direct answer / finalize.
    Agent,
    /// Tool call (pending or completed).
    Tool,
    /// Parse, validation or dispatch failure.
    Error,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Agent => "agent",
            StepKind::Tool => "tool",
            StepKind::Error => "error",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurements taken around a single chat completion call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmCallMetadata {
    pub latency_ms: u64,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<UsageInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Metadata recorded on every step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepMeta {
    /// Context-switch count at the time the step was recorded.
    pub context_switches: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<UsageInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl StepMeta {
    fn snapshot(context_switches: u32, llm: Option<&LlmCallMetadata>) -> Self {
        match llm {
            Some(llm) => StepMeta {
                context_switches,
                tokens: llm.tokens,
                latency_ms: Some(llm.latency_ms),
                model: Some(llm.model.clone()),
                finish_reason: llm.finish_reason.clone(),
            },
            None => StepMeta {
                context_switches,
                ..Default::default()
            },
        }
    }
}

/// Outcome of one iteration before it is recorded.
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutput {
    pub kind: StepKind,
    pub thought: String,
    pub action: Option<String>,
    pub parameter: Option<Value>,
    pub result: Option<Value>,
    pub llm: Option<LlmCallMetadata>,
}

impl StepOutput {
    /// Whether this output is a successful finalize.
    pub fn is_finalize(&self) -> bool {
        self.kind == StepKind::Agent && self.action.as_deref() == Some(FINALIZE)
    }
}

/// A recorded step. Appended to the history and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub kind: StepKind,
    pub thought: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub meta: StepMeta,
}

impl Step {
    /// Whether this step ended the run with an answer.
    pub fn is_finalize(&self) -> bool {
        self.kind == StepKind::Agent && self.action.as_deref() == Some(FINALIZE)
    }

    /// The result as text: strings verbatim, everything else as pretty JSON.
    pub fn result_text(&self) -> Option<String> {
        self.result.as_ref().map(render_value)
    }
}

/// Strings verbatim, other values pretty-printed.
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

// ─────────────────────────────────────────────
// StepTracker
// ─────────────────────────────────────────────

/// Owns the run state: recorded steps, the step budget and the
/// context-switch counter.
#[derive(Debug)]
pub struct StepTracker {
    steps: Vec<Step>,
    max_steps: usize,
    context_switches: u32,
}

impl StepTracker {
    pub fn new(max_steps: usize) -> Self {
        Self {
            steps: Vec::new(),
            max_steps,
            context_switches: 0,
        }
    }

    /// Reset for a new run.
    pub fn initialize(&mut self) {
        self.steps.clear();
        self.context_switches = 0;
    }

    /// Record a step, stamping the current context-switch count and any LLM
    /// call metadata.
    pub fn add_step(&mut self, output: StepOutput) -> &Step {
        let meta = StepMeta::snapshot(self.context_switches, output.llm.as_ref());
        self.steps.push(Step {
            kind: output.kind,
            thought: output.thought,
            action: output.action,
            parameter: output.parameter,
            result: output.result,
            meta,
        });
        &self.steps[self.steps.len() - 1]
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn has_reached_max(&self) -> bool {
        self.step_count() >= self.max_steps
    }

    pub fn context_switches(&self) -> u32 {
        self.context_switches
    }

    pub fn increment_context_switches(&mut self) {
        self.context_switches += 1;
    }

    /// True when the step's result is exactly one of the erosion sentinels.
    ///
    /// Matching is by equality, so a full dispatch message such as
    /// `"Tool not found: x. Available: y"` does not count.
    pub fn is_eroded(&self, step: &Step) -> bool {
        matches!(&step.result, Some(Value::String(s)) if EROSION_SENTINELS.contains(&s.as_str()))
    }

    /// The "task started" marker that heads the public trace.
    pub fn marker_step(&self) -> Step {
        Step {
            kind: StepKind::Agent,
            thought: "Agent task started by user".to_string(),
            action: Some(PENDING.to_string()),
            parameter: None,
            result: None,
            meta: StepMeta {
                context_switches: self.context_switches,
                ..Default::default()
            },
        }
    }

    /// Marker followed by every recorded step.
    pub fn trace(&self) -> Vec<Step> {
        let mut trace = Vec::with_capacity(self.steps.len() + 1);
        trace.push(self.marker_step());
        trace.extend(self.steps.iter().cloned());
        trace
    }

    /// Render recorded steps as alternating assistant / observation turns.
    pub fn build_history(&self) -> Vec<Message> {
        let mut history = Vec::new();

        for step in &self.steps {
            if let Some(action) = &step.action {
                let mut msg = format!("thought: {}\naction: {}\n", step.thought, action);
                if let Some(param) = step.parameter.as_ref().filter(|p| is_present(p)) {
                    msg.push_str(&format!("parameter:\n{}\n", parameter_to_yaml(param)));
                }
                history.push(Message::assistant(msg));
            }

            match &step.result {
                Some(Value::String(s)) if s == PENDING => {}
                Some(result) => {
                    history.push(Message::user(format!(
                        "observation:\n{}",
                        render_value(result)
                    )));
                }
                None => {}
            }
        }

        history
    }
}

fn is_present(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
        && !matches!(value, Value::String(s) if s.is_empty())
}

/// `  key: <json>` per field for objects; anything else inline.
fn parameter_to_yaml(param: &Value) -> String {
    match param {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("  {}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
