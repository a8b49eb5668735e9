//! Run-level token and latency totals.

use serde::{Deserialize, Serialize};

use crate::steps::Step;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub total_tokens: u64,
    pub total_latency_ms: u64,
    /// Steps that carried token usage.
    pub llm_calls: usize,
}

impl UsageSummary {
    /// Sum step metadata. Steps without tokens add nothing and are not
    /// counted as calls; latency is summed wherever present.
    pub fn aggregate(steps: &[Step]) -> Self {
        steps.iter().fold(Self::default(), |mut usage, step| {
            if let Some(tokens) = step.meta.tokens {
                usage.total_prompt_tokens += u64::from(tokens.prompt_tokens);
                usage.total_completion_tokens += u64::from(tokens.completion_tokens);
                usage.total_tokens += u64::from(tokens.total_tokens);
                usage.llm_calls += 1;
            }
            if let Some(latency) = step.meta.latency_ms {
                usage.total_latency_ms += latency;
            }
            usage
        })
    }
}
