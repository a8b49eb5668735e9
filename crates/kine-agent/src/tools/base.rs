//! Tool trait — the abstract interface every agent tool must implement.

use std::future::Future;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use super::schema::Schema;

// ─────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────

/// Every agent tool implements this trait.
///
/// The registry advertises tools via `name()`, `description()` and example
/// payloads generated from the schemas, and dispatches calls via `execute()`
/// after validating the input against `input_schema()`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses in `<action>` (e.g. `"get_weather"`).
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// Shape of the `<parameter>` payload.
    fn input_schema(&self) -> Schema;

    /// Shape of the value returned by `execute`.
    fn output_schema(&self) -> Schema {
        Schema::Any
    }

    /// Execute the tool with an already validated input.
    ///
    /// On failure, return an `Err` — the registry will catch it and
    /// report it back to the model as an observation.
    async fn execute(&self, input: Value) -> anyhow::Result<Value>;
}

// ─────────────────────────────────────────────
// FnTool
// ─────────────────────────────────────────────

type Handler = Box<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// A tool built from a closure, for tools that need no state of their own.
///
/// ```no_run
/// use kine_agent::tools::{FnTool, Schema};
/// use serde_json::json;
///
/// let echo = FnTool::new(
///     "echo",
///     "Echo the text back",
///     Schema::object([("text", Schema::String)]),
///     Schema::String,
///     |input| async move { Ok(input["text"].clone()) },
/// );
/// ```
pub struct FnTool {
    name: String,
    description: String,
    input: Schema,
    output: Schema,
    handler: Handler,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input: Schema,
        output: Schema,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input,
            output,
            handler: Box::new(move |input| handler(input).boxed()),
        }
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool").field("name", &self.name).finish()
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Schema {
        self.input.clone()
    }

    fn output_schema(&self) -> Schema {
        self.output.clone()
    }

    async fn execute(&self, input: Value) -> anyhow::Result<Value> {
        (self.handler)(input).await
    }
}

// ─────────────────────────────────────────────
// Param helpers
// ─────────────────────────────────────────────

/// Extract a required string field, returning a user-friendly error.
pub fn require_str(params: &Value, key: &str) -> anyhow::Result<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {key}"))
}

/// Extract a required numeric field.
pub fn require_f64(params: &Value, key: &str) -> anyhow::Result<f64> {
    params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {key}"))
}
