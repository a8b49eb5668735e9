//! Calculator tool — basic arithmetic on two numbers.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::base::{require_f64, require_str, Tool};
use super::schema::Schema;

const OPERATIONS: [&str; 4] = ["add", "subtract", "multiply", "divide"];

/// Performs `add`, `subtract`, `multiply` or `divide` on `a` and `b`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform basic arithmetic operations (add, subtract, multiply, divide)"
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            ("operation", Schema::enumeration(OPERATIONS)),
            ("a", Schema::Number),
            ("b", Schema::Number),
        ])
    }

    fn output_schema(&self) -> Schema {
        Schema::object([("result", Schema::Number), ("operation", Schema::String)])
    }

    async fn execute(&self, input: Value) -> anyhow::Result<Value> {
        let operation = require_str(&input, "operation")?;
        let a = require_f64(&input, "a")?;
        let b = require_f64(&input, "b")?;

        let result = match operation.as_str() {
            "add" => a + b,
            "subtract" => a - b,
            "multiply" => a * b,
            "divide" => {
                if b == 0.0 {
                    anyhow::bail!("Division by zero is not allowed");
                }
                a / b
            }
            other => anyhow::bail!("Unknown operation: {other}"),
        };

        Ok(json!({
            "result": result,
            "operation": format!("{a} {operation} {b} = {result}"),
        }))
    }
}
