//! The value a run hands back to its caller.

use serde::Serialize;

use kine_core::utils::char_prefix;

use crate::steps::{Step, StepKind};
use crate::usage::UsageSummary;

/// Final answer, full step trace and usage of one run.
///
/// `steps[0]` is the "task started" marker; the recorded steps follow.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunResult {
    final_answer: String,
    steps: Vec<Step>,
    usage: UsageSummary,
}

impl RunResult {
    pub fn new(final_answer: String, steps: Vec<Step>) -> Self {
        let usage = UsageSummary::aggregate(&steps);
        Self {
            final_answer,
            steps,
            usage,
        }
    }

    pub fn final_answer(&self) -> &str {
        &self.final_answer
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn usage(&self) -> &UsageSummary {
        &self.usage
    }

    fn count(&self, kind: StepKind) -> usize {
        self.steps.iter().filter(|s| s.kind == kind).count()
    }

    /// One line: truncated answer plus step counts.
    pub fn summary(&self) -> String {
        let answer = if self.final_answer.chars().count() > 100 {
            format!("{}...", char_prefix(&self.final_answer, 100))
        } else {
            self.final_answer.clone()
        };
        format!(
            "Response: {} | Steps: {} (Tools: {}, Errors: {})",
            answer,
            self.steps.len(),
            self.count(StepKind::Tool),
            self.count(StepKind::Error),
        )
    }

    /// Numbered step list with thoughts and results.
    pub fn formatted_steps(&self) -> String {
        if self.steps.is_empty() {
            return "No steps recorded.".to_string();
        }
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let mut out = format!(
                    "Step {} ({}): {}",
                    i + 1,
                    step.kind,
                    step.action.as_deref().unwrap_or("N/A")
                );
                if !step.thought.is_empty() {
                    out.push_str(&format!("\n  Thought: {}", step.thought));
                }
                if let Some(result) = &step.result {
                    let text = match result {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    out.push_str(&format!("\n  Result: {text}"));
                }
                out
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Boxed multi-line report for terminals.
    pub fn beautify(&self) -> String {
        let heavy = "=".repeat(80);
        let rule = "-".repeat(60);
        let mut out = format!("{heavy}\nKINE AGENT RESPONSE\n{heavy}\n\n");
        out.push_str(&format!("Final Answer:\n{}\n\n", self.final_answer));

        if !self.steps.is_empty() {
            out.push_str(&format!("Execution Steps:\n{rule}\n"));
            for (i, step) in self.steps.iter().enumerate() {
                out.push_str(&format!(
                    "Step {} ({})\n",
                    i + 1,
                    step.kind.as_str().to_uppercase()
                ));
                if !step.thought.is_empty() {
                    out.push_str(&format!("Thought: {}\n", step.thought));
                }
                if let Some(action) = &step.action {
                    out.push_str(&format!("Action: {action}\n"));
                }
                if let Some(param) = step.parameter.as_ref().filter(|p| !p.is_null()) {
                    let pretty =
                        serde_json::to_string_pretty(param).unwrap_or_else(|_| param.to_string());
                    out.push_str(&format!("Parameters: {pretty}\n"));
                }
                if let Some(text) = step.result_text() {
                    out.push_str(&format!("Result: {text}\n"));
                }
                if i + 1 < self.steps.len() {
                    out.push_str(&format!("{}\n", "-".repeat(40)));
                }
            }
            out.push_str(&format!("{rule}\n"));

            out.push_str("\nExecution Summary:\n");
            out.push_str(&format!("Total Steps: {}\n", self.steps.len()));
            out.push_str(&format!(
                "Successful Tool Calls: {}\n",
                self.count(StepKind::Tool)
            ));
            let errors = self.count(StepKind::Error);
            if errors > 0 {
                out.push_str(&format!("Errors: {errors}\n"));
            }
        }

        out.push_str(&format!("\n{heavy}\n"));
        out
    }
}
