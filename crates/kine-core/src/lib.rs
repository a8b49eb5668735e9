//! Kine Core — shared types, configuration, and utilities.
//!
//! This crate contains:
//! - **types**: chat messages, tool calls, token usage, provider responses
//! - **config**: configuration schema, loader, and env var overrides
//! - **utils**: path resolution and string helpers

pub mod config;
pub mod types;
pub mod utils;

pub use config::Config;
pub use types::{LlmResponse, Message, Role, ToolCall, UsageInfo};
