//! Tool Registry — named capabilities, their listing for the model, and
//! validated dispatch.
//!
//! The agent registers tools here; the step executor dispatches `<action>`
//! requests by name.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::base::Tool;
use super::schema::SchemaError;
use crate::steps::FINALIZE;

// ─────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────

/// Why a dispatch failed. The display text is what the model sees.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {name}. Available: {available}")]
    NotFound { name: String, available: String },

    #[error("Tool execution failed: Invalid input: {0}. Please try again with different parameters.")]
    InputValidation(SchemaError),

    #[error("Tool execution failed: {0}. Please try again with different parameters.")]
    Execution(String),
}

/// A failed dispatch, with the parameter to echo back for diagnostics:
/// the validated input when validation got that far, else the raw one.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchFailure {
    pub error: ToolError,
    pub parameter: Option<Value>,
}

impl std::fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for DispatchFailure {}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools keyed by name and dispatches calls.
///
/// Owns `Arc<dyn Tool>` so tools can be shared across agents.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Overwrites any previous tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        info!(tool = tool.name(), "registered tool");
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Unregister a tool by name. Returns the removed tool, if any.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        let removed = self.tools.remove(name);
        if removed.is_some() {
            info!(tool = name, "unregistered tool");
        }
        removed
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all registered tools, sorted for determinism.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// The tool listing embedded in the system prompt.
    pub fn describe(&self) -> String {
        if self.tools.is_empty() {
            return format!("No tools available. Use '{FINALIZE}' to answer.");
        }

        let entries = self
            .tool_names()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                format!(
                    "  - {}: {}\n    Input example: {}\n    Output example: {}",
                    tool.name(),
                    tool.description(),
                    pretty_example(&tool.input_schema().example()),
                    pretty_example(&tool.output_schema().example()),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!("Available tools:\n{entries}\n  - {FINALIZE}: End task and provide final answer")
    }

    /// Validate the input, execute, and validate the output.
    ///
    /// Tool errors are caught and returned as [`DispatchFailure`]; nothing
    /// here panics or retries.
    pub async fn dispatch(
        &self,
        name: &str,
        parameter: Option<&Value>,
    ) -> Result<Value, DispatchFailure> {
        let raw = parameter.cloned().unwrap_or(Value::Null);

        let tool = match self.tools.get(name) {
            Some(t) => t,
            None => {
                warn!(tool = name, "tool not found");
                return Err(DispatchFailure {
                    error: ToolError::NotFound {
                        name: name.to_string(),
                        available: self.tool_names().join(", "),
                    },
                    parameter: parameter.cloned(),
                });
            }
        };

        let input = match tool.input_schema().validate(&raw) {
            Ok(input) => input,
            Err(e) => {
                warn!(tool = name, error = %e, "tool input rejected");
                return Err(DispatchFailure {
                    error: ToolError::InputValidation(e),
                    parameter: parameter.cloned(),
                });
            }
        };

        debug!(tool = name, "executing tool");

        let output = match tool.execute(input.clone()).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                return Err(DispatchFailure {
                    error: ToolError::Execution(e.to_string()),
                    parameter: Some(input),
                });
            }
        };

        tool.output_schema().validate(&output).map_err(|e| {
            warn!(tool = name, error = %e, "tool output rejected");
            DispatchFailure {
                error: ToolError::Execution(format!("Invalid output: {e}")),
                parameter: Some(input),
            }
        })
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn pretty_example(example: &Value) -> String {
    serde_json::to_string_pretty(example)
        .unwrap_or_else(|_| "Unable to generate example".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FnTool, Schema};
    use async_trait::async_trait;
    use serde_json::json;

    /// Minimal test tool.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn input_schema(&self) -> Schema {
            Schema::object([("text", Schema::String.describe("Text to echo"))])
        }
        fn output_schema(&self) -> Schema {
            Schema::String
        }
        async fn execute(&self, input: Value) -> anyhow::Result<Value> {
            let text = input["text"].as_str().unwrap_or("(empty)");
            Ok(json!(format!("Echo: {text}")))
        }
    }

    /// Tool that always fails.
    struct FailTool;

    #[async_trait]
    impl Tool for FailTool {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn input_schema(&self) -> Schema {
            Schema::Object(vec![])
        }
        async fn execute(&self, _input: Value) -> anyhow::Result<Value> {
            anyhow::bail!("intentional failure")
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        assert!(reg.has("echo"));
        assert!(!reg.has("nope"));
        assert!(reg.get("echo").is_some());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_register_last_write_wins() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.register(Arc::new(FnTool::new(
            "echo",
            "Replacement",
            Schema::Any,
            Schema::Any,
            |v| async move { Ok(v) },
        )));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("echo").unwrap().description(), "Replacement");
    }

    #[test]
    fn test_unregister() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        assert!(reg.unregister("echo").is_some());
        assert!(reg.unregister("echo").is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_tool_names_sorted() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(FailTool));
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.tool_names(), vec!["echo", "fail"]);
    }

    #[test]
    fn test_describe_empty() {
        assert_eq!(
            ToolRegistry::new().describe(),
            "No tools available. Use 'finalize' to answer."
        );
    }

    #[test]
    fn test_describe_lists_tools_and_finalize() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(FailTool));
        reg.register(Arc::new(EchoTool));

        let listing = reg.describe();
        let expected = "Available tools:\n  \
             - echo: Echoes back the input\n    \
             Input example: {\n  \"text\": \"string\"\n}\n    \
             Output example: \"string\"\n  \
             - fail: Always fails\n    \
             Input example: {}\n    \
             Output example: null\n  \
             - finalize: End task and provide final answer";
        assert_eq!(listing, expected);
        // Idempotent
        assert_eq!(reg.describe(), listing);
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        let result = reg.dispatch("echo", Some(&json!({"text": "hello"}))).await;
        assert_eq!(result.unwrap(), json!("Echo: hello"));
    }

    #[tokio::test]
    async fn test_dispatch_not_found() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.register(Arc::new(FailTool));
        let failure = reg
            .dispatch("nonexistent_tool", Some(&json!({})))
            .await
            .unwrap_err();
        assert_eq!(
            failure.to_string(),
            "Tool not found: nonexistent_tool. Available: echo, fail"
        );
        assert_eq!(failure.parameter, Some(json!({})));
    }

    #[tokio::test]
    async fn test_dispatch_input_validation() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        let failure = reg.dispatch("echo", Some(&json!({"text": 5}))).await.unwrap_err();
        assert!(matches!(failure.error, ToolError::InputValidation(_)));
        assert!(failure.to_string().starts_with("Tool execution failed:"));
        assert!(failure.to_string().contains("text: Expected string"));

        // Missing parameter is validated as null
        let failure = reg.dispatch("echo", None).await.unwrap_err();
        assert!(failure.to_string().contains("Expected object, received null"));
        assert_eq!(failure.parameter, None);
    }

    #[tokio::test]
    async fn test_dispatch_execution_error_caught() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(FailTool));
        let failure = reg
            .dispatch("fail", Some(&json!({"junk": 1})))
            .await
            .unwrap_err();
        assert_eq!(
            failure.to_string(),
            "Tool execution failed: intentional failure. Please try again with different parameters."
        );
        // Validated input (unknown keys stripped) is echoed back
        assert_eq!(failure.parameter, Some(json!({})));
    }

    #[tokio::test]
    async fn test_dispatch_output_mismatch() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(FnTool::new(
            "liar",
            "Promises a number, returns text",
            Schema::Any,
            Schema::Number,
            |_| async move { Ok(json!("not a number")) },
        )));
        let failure = reg.dispatch("liar", None).await.unwrap_err();
        assert!(matches!(failure.error, ToolError::Execution(_)));
        assert!(failure.to_string().contains("Invalid output"));
    }

    #[test]
    fn test_default() {
        let reg = ToolRegistry::default();
        assert!(reg.is_empty());
    }
}
