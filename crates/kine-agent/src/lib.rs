//! Kine Agent — the ReAct loop, response parsing, tools and memory.
//!
//! This crate contains:
//! - **response**: tag/plain-text parsing, validation and step conversion
//! - **tools**: `Tool` trait, schemas, the registry/dispatcher and built-ins
//! - **steps** / **conversation**: the per-run step history and memory mirror
//! - **executor** / **execution_loop**: one THINK → ACT iteration, and the
//!   state machine driving iterations to finalize or timeout
//! - **agent**: the builder and `run` / `run_streaming` entry points

pub mod agent;
pub mod conversation;
pub mod error;
pub mod execution_loop;
pub mod executor;
pub mod memory;
pub mod prompt;
pub mod response;
pub mod result;
pub mod steps;
pub mod tools;
pub mod usage;

pub use agent::{Agent, AgentBuilder};
pub use error::AgentError;
pub use execution_loop::{LoopState, RunEvent};
pub use memory::{Memory, SimpleMemory};
pub use response::{PlainTextFormatter, ResponseFormatter, TaggedFormatter};
pub use result::RunResult;
pub use steps::{Step, StepKind};
pub use tools::{CalculatorTool, FnTool, Schema, Tool, ToolRegistry};
pub use usage::UsageSummary;
