//! Tool modules for the Kine agent.

pub mod base;
pub mod calculator;
pub mod registry;
pub mod schema;

pub use base::{require_f64, require_str, FnTool, Tool};
pub use calculator::CalculatorTool;
pub use registry::{DispatchFailure, ToolError, ToolRegistry};
pub use schema::{Schema, SchemaError};
