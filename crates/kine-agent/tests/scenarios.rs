//! End-to-end runs against a scripted provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use kine_agent::memory::Memory;
use kine_agent::{
    Agent, AgentError, CalculatorTool, FnTool, PlainTextFormatter, RunEvent, Schema,
    SimpleMemory, StepKind, ToolRegistry,
};
use kine_core::types::{LlmResponse, Message};
use kine_providers::{LlmProvider, ProviderError};

// ─────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────

/// Replays canned responses in order and records every request.
struct ScriptedProvider {
    replies: Mutex<Vec<LlmResponse>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .iter()
                    .map(|r| LlmResponse::text(*r, "mock-model").with_usage(100, 20))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat_completion(
        &self,
        messages: &[Message],
        _model: &str,
    ) -> Result<LlmResponse, ProviderError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(ProviderError::Api {
                status: 500,
                body: "script exhausted".into(),
            });
        }
        Ok(replies.remove(0))
    }
}

fn weather_tool() -> Arc<FnTool> {
    Arc::new(FnTool::new(
        "get_weather",
        "Get the current weather for a location",
        Schema::object([("location", Schema::String)]),
        Schema::object([
            ("location", Schema::String),
            ("condition", Schema::String),
            ("temperature", Schema::Number),
        ]),
        |input: Value| async move {
            Ok(json!({
                "location": input["location"],
                "condition": "sunny",
                "temperature": 22,
            }))
        },
    ))
}

fn build_agent(provider: Arc<ScriptedProvider>, max_steps: usize) -> Agent {
    Agent::builder()
        .id("test-agent")
        .model("mock-model")
        .max_steps(max_steps)
        .provider(provider)
        .build()
        .unwrap()
}

const WEATHER_CALL: &str = "<thought>I need the weather.</thought>\
<action>get_weather</action>\
<parameter><location>Paris</location></parameter>";

const WEATHER_ANSWER: &str = "<thought>Got it.</thought>\
<action>finalize</action>\
<final_answer>It is sunny in Paris.</final_answer>";

// ─────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────

#[tokio::test]
async fn test_weather_then_finalize() {
    let provider = ScriptedProvider::new(&[WEATHER_CALL, WEATHER_ANSWER]);
    let mut agent = build_agent(provider.clone(), 10);
    agent.register_tool(weather_tool());

    let result = agent.run("What is the weather in Paris?").await.unwrap();

    assert_eq!(result.final_answer(), "It is sunny in Paris.");
    assert_eq!(result.steps().len(), 3);
    assert_eq!(result.usage().llm_calls, 2);
    assert_eq!(result.usage().total_tokens, 240);

    let tool_step = &result.steps()[1];
    assert_eq!(tool_step.kind, StepKind::Tool);
    assert_eq!(tool_step.parameter, Some(json!({"location": "Paris"})));
    assert_eq!(tool_step.result.as_ref().unwrap()["condition"], "sunny");
    assert_eq!(result.steps()[2].kind, StepKind::Agent);

    // The second call sees the tool call and its observation.
    let second = &provider.requests()[1];
    assert_eq!(second[1], Message::user("What is the weather in Paris?"));
    assert_eq!(
        second[2],
        Message::assistant(
            "thought: I need the weather.\naction: get_weather\nparameter:\n  location: \"Paris\"\n"
        )
    );
    let observation = second[3].content().unwrap();
    assert!(observation.starts_with("observation:\n{"));
    assert!(observation.contains("\"condition\": \"sunny\""));
}

#[tokio::test]
async fn test_garbage_until_timeout() {
    let provider = ScriptedProvider::new(&["???", "???", "???"]);
    let mut agent = build_agent(provider.clone(), 3);

    let result = agent.run("Anything").await.unwrap();

    assert_eq!(result.final_answer(), "Agent timed out (max 3 steps).");
    let recorded = &result.steps()[1..];
    assert_eq!(recorded.len(), 3);
    assert!(recorded.iter().all(|s| s.kind == StepKind::Error));
    assert_eq!(provider.requests().len(), 3);
}

#[tokio::test]
async fn test_unknown_tool_is_reported() {
    let tools = ToolRegistry::new();
    let failure = tools
        .dispatch("nonexistent_tool", Some(&json!({})))
        .await
        .unwrap_err();
    assert!(failure.to_string().contains("Tool not found"));

    let provider = ScriptedProvider::new(&[
        "<thought>t</thought><action>nonexistent_tool</action><parameter>{}</parameter>",
        WEATHER_ANSWER,
    ]);
    let mut agent = build_agent(provider, 5);
    let result = agent.run("Weather?").await.unwrap();

    let error = &result.steps()[1];
    assert_eq!(error.kind, StepKind::Error);
    assert!(error.result_text().unwrap().starts_with("Tool not found: nonexistent_tool"));
    assert_eq!(result.final_answer(), "It is sunny in Paris.");
}

#[tokio::test]
async fn test_stuck_steps_count_context_switches() {
    let lookup = Arc::new(FnTool::new(
        "lookup",
        "Look up a record",
        Schema::object([("query", Schema::String)]),
        Schema::String,
        |_input: Value| async move { Ok(json!("Tool not found")) },
    ));
    let lookup_call =
        "<thought>search</thought><action>lookup</action><parameter><query>x</query></parameter>";
    let provider = ScriptedProvider::new(&[lookup_call, lookup_call, WEATHER_ANSWER]);
    let mut agent = build_agent(provider, 10);
    agent.register_tool(lookup);

    let result = agent.run("Find x").await.unwrap();

    let kinds: Vec<StepKind> = result.steps().iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![StepKind::Agent, StepKind::Tool, StepKind::Tool, StepKind::Agent]
    );
    // Each step records the count at the time it was added; the marker
    // carries the final count.
    let switches: Vec<u32> = result
        .steps()
        .iter()
        .map(|s| s.meta.context_switches)
        .collect();
    assert_eq!(switches, vec![2, 0, 1, 2]);
    assert_eq!(result.final_answer(), "It is sunny in Paris.");
}

#[tokio::test]
async fn test_division_by_zero_continues() {
    let provider = ScriptedProvider::new(&[
        r#"<thought>divide</thought><action>calculator</action><parameter>{"operation":"divide","a":1,"b":0}</parameter>"#,
        "<thought>Cannot divide.</thought><action>finalize</action><final_answer>Division by zero is undefined.</final_answer>",
    ]);
    let mut agent = build_agent(provider, 5);
    agent.register_tool(Arc::new(CalculatorTool));

    let result = agent.run("What is 1/0?").await.unwrap();

    let error = &result.steps()[1];
    assert_eq!(error.kind, StepKind::Error);
    let message = error.result_text().unwrap();
    assert!(message.contains("Tool execution failed"));
    assert!(message.contains("Division by zero"));
    assert_eq!(result.final_answer(), "Division by zero is undefined.");
    assert_eq!(result.usage().llm_calls, 2);
}

#[tokio::test]
async fn test_finalize_on_last_allowed_step() {
    let provider = ScriptedProvider::new(&["???", WEATHER_ANSWER]);
    let mut agent = build_agent(provider, 2);

    let result = agent.run("Weather?").await.unwrap();
    assert_eq!(result.final_answer(), "It is sunny in Paris.");
    assert_eq!(result.steps().len(), 3);
}

#[tokio::test]
async fn test_plain_text_formatter_finalizes() {
    let provider = ScriptedProvider::new(&["The answer is forty-two."]);
    let mut agent = Agent::builder()
        .id("plain")
        .model("mock-model")
        .formatter(Arc::new(PlainTextFormatter))
        .provider(provider)
        .build()
        .unwrap();

    let result = agent.run("Meaning of life?").await.unwrap();
    assert_eq!(result.final_answer(), "The answer is forty-two.");
}

#[tokio::test]
async fn test_streaming_events() {
    let provider = ScriptedProvider::new(&[WEATHER_CALL, WEATHER_ANSWER]);
    let mut agent = build_agent(provider, 10);
    agent.register_tool(weather_tool());

    let events: Vec<RunEvent> = agent
        .run_streaming("What is the weather in Paris?")
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], RunEvent::Step(s) if s.kind == StepKind::Tool));
    assert!(matches!(&events[1], RunEvent::Step(s) if s.is_finalize()));
    match &events[2] {
        RunEvent::Completed(result) => {
            assert_eq!(result.final_answer(), "It is sunny in Paris.");
            assert_eq!(result.steps().len(), 3);
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_streaming_is_lazy() {
    let provider = ScriptedProvider::new(&[WEATHER_CALL, WEATHER_ANSWER]);
    let mut agent = build_agent(provider.clone(), 10);
    agent.register_tool(weather_tool());

    {
        let stream = agent.run_streaming("Weather?");
        futures::pin_mut!(stream);
        assert!(provider.requests().is_empty());
        let first = stream.next().await.unwrap().unwrap();
        assert!(matches!(first, RunEvent::Step(_)));
        assert_eq!(provider.requests().len(), 1);
    }
}

#[tokio::test]
async fn test_provider_error_aborts_run() {
    let provider = ScriptedProvider::new(&[]);
    let mut agent = build_agent(provider, 5);

    let err = agent.run("Hello").await.unwrap_err();
    assert!(matches!(err, AgentError::Provider(ProviderError::Api { status: 500, .. })));

    let provider = ScriptedProvider::new(&[]);
    let mut agent = build_agent(provider, 5);
    let events: Vec<_> = agent.run_streaming("Hello").collect().await;
    assert_eq!(events.len(), 1);
    assert!(events[0].is_err());
}

#[tokio::test]
async fn test_memory_shared_across_runs() {
    let memory = Arc::new(SimpleMemory::default());
    let provider = ScriptedProvider::new(&[
        "<thought>t</thought><action>finalize</action><final_answer>Hi Ana.</final_answer>",
        "<thought>t</thought><action>finalize</action><final_answer>Your name is Ana.</final_answer>",
    ]);
    let mut agent = Agent::builder()
        .id("memo")
        .model("mock-model")
        .memory(memory.clone())
        .provider(provider.clone())
        .build()
        .unwrap();

    agent.run("My name is Ana.").await.unwrap();
    let result = agent.run("What is my name?").await.unwrap();
    assert_eq!(result.final_answer(), "Your name is Ana.");
    // Each run starts from a fresh tracker.
    assert_eq!(result.steps().len(), 2);

    let second = &provider.requests()[1];
    assert_eq!(
        &second[1..],
        &[
            Message::user("My name is Ana."),
            Message::assistant("Hi Ana."),
            Message::user("What is my name?"),
        ]
    );

    let stats = memory.stats();
    assert_eq!(stats.user_messages, 2);
    assert_eq!(stats.assistant_messages, 2);
    assert_eq!(stats.agent_steps, 2);
    assert!(memory.to_conversation_history().len() >= 4);
}
