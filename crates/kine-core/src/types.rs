//! Core types for Kine — the chat-completion wire shapes shared by the agent
//! and the provider layer.
//!
//! Messages model the OpenAI chat completions format. A Rust enum keeps the
//! role/field combinations honest instead of passing loose maps around.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────

/// Conversation role of a plain-text message.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────
// Messages (OpenAI chat completions format)
// ─────────────────────────────────────────────

/// A chat message in the OpenAI format.
///
/// Each variant maps to a `role` field value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "system")]
    System { content: String },

    #[serde(rename = "user")]
    User { content: String },

    #[serde(rename = "assistant")]
    Assistant {
        #[serde(default)]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
    },

    #[serde(rename = "tool")]
    Tool {
        content: String,
        tool_call_id: String,
    },
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    /// Create an assistant message with text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    /// Create an assistant message with tool calls (no text content).
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content: None,
            tool_calls: Some(tool_calls),
        }
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Build a plain-text message for the given role.
    pub fn with_role(role: Role, content: impl Into<String>) -> Self {
        match role {
            Role::System => Message::system(content),
            Role::User => Message::user(content),
            Role::Assistant => Message::assistant(content),
        }
    }

    /// The wire name of this message's role.
    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::User { .. } => "user",
            Message::Assistant { .. } => "assistant",
            Message::Tool { .. } => "tool",
        }
    }

    /// Text content, if any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Message::System { content } | Message::User { content } => Some(content),
            Message::Assistant { content, .. } => content.as_deref(),
            Message::Tool { content, .. } => Some(content),
        }
    }
}

// ─────────────────────────────────────────────
// Tool Calls
// ─────────────────────────────────────────────

/// A tool call recorded on an assistant message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Unique ID for this tool call (used to match results).
    pub id: String,
    /// Always "function" in current OpenAI API.
    #[serde(rename = "type")]
    pub call_type: String,
    /// The function to call.
    pub function: FunctionCall,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        ToolCall {
            id: id.into(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// The function name and arguments within a tool call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments string.
    pub arguments: String,
}

// ─────────────────────────────────────────────
// LLM Response
// ─────────────────────────────────────────────

/// Response from an LLM provider after a chat completion call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LlmResponse {
    /// Text content from the assistant (empty if the model returned none).
    pub content: String,
    /// Model that actually served the request.
    pub model: String,
    /// Token usage statistics.
    pub usage: Option<UsageInfo>,
    /// Why the model stopped generating.
    pub finish_reason: Option<String>,
}

impl LlmResponse {
    /// A plain text response with no usage information.
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        LlmResponse {
            content: content.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Attach token usage (builder style).
    pub fn with_usage(mut self, prompt_tokens: u32, completion_tokens: u32) -> Self {
        self.usage = Some(UsageInfo::new(prompt_tokens, completion_tokens));
        self
    }
}

/// Token usage statistics from the LLM.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UsageInfo {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl UsageInfo {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

// ─────────────────────────────────────────────
// Provider wire types
// ─────────────────────────────────────────────

/// Request body for an OpenAI-compatible chat completion API.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
}

/// Raw chat completion response from an OpenAI-compatible API.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<UsageInfo>,
}

/// A single choice in a chat completion response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The assistant message within a chat completion choice.
#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Convert into an `LlmResponse`, falling back to `requested_model` when
    /// the API omits the model field. Missing choices yield empty content.
    pub fn into_response(self, requested_model: &str) -> LlmResponse {
        let model = self.model.unwrap_or_else(|| requested_model.to_string());
        let (content, finish_reason) = match self.choices.into_iter().next() {
            Some(choice) => (choice.message.content.unwrap_or_default(), choice.finish_reason),
            None => (String::new(), None),
        };
        LlmResponse {
            content,
            model,
            usage: self.usage,
            finish_reason,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_message_serialization() {
        let msg = Message::system("You are a helpful assistant.");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "You are a helpful assistant.");
    }

    #[test]
    fn test_assistant_tool_calls_serialization() {
        let msg = Message::assistant_tool_calls(vec![ToolCall::new(
            "call_1",
            "get_weather",
            r#"{"location":"Paris"}"#,
        )]);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "assistant");
        assert!(json["content"].is_null());
        assert_eq!(json["tool_calls"][0]["id"], "call_1");
        assert_eq!(json["tool_calls"][0]["type"], "function");
        assert_eq!(json["tool_calls"][0]["function"]["name"], "get_weather");
    }

    #[test]
    fn test_assistant_text_omits_tool_calls() {
        let json = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn test_tool_result_serialization() {
        let msg = Message::tool_result("call_1", "sunny");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
        assert_eq!(json["content"], "sunny");
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = Message::user("hello");
        let text = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&text).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_role_and_content_accessors() {
        assert_eq!(Message::user("a").role(), "user");
        assert_eq!(Message::user("a").content(), Some("a"));
        assert_eq!(Message::assistant_tool_calls(vec![]).content(), None);
        assert_eq!(Message::with_role(Role::Assistant, "b").role(), "assistant");
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn test_usage_info_total() {
        let usage = UsageInfo::new(10, 5);
        assert_eq!(usage.total_tokens, 15);
    }

    #[test]
    fn test_chat_completion_response_conversion() {
        let raw = json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "<action>finalize</action>" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
        });
        let resp: ChatCompletionResponse = serde_json::from_value(raw).unwrap();
        let llm = resp.into_response("requested");

        assert_eq!(llm.content, "<action>finalize</action>");
        assert_eq!(llm.model, "gpt-4o-mini");
        assert_eq!(llm.finish_reason.as_deref(), Some("stop"));
        assert_eq!(llm.usage, Some(UsageInfo::new(12, 3)));
    }

    #[test]
    fn test_chat_completion_response_without_choices() {
        let resp: ChatCompletionResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        let llm = resp.into_response("fallback-model");
        assert_eq!(llm.content, "");
        assert_eq!(llm.model, "fallback-model");
        assert!(llm.usage.is_none());
    }
}
