//! System prompt — identity, tool listing and the response protocol.

/// Description used when the agent has none.
pub const DEFAULT_DESCRIPTION: &str = "AI Agent built with Kine";

/// Builds the system prompt for an agent.
#[derive(Clone, Debug)]
pub struct SystemPromptBuilder {
    agent_id: String,
    description: String,
}

impl SystemPromptBuilder {
    pub fn new(agent_id: impl Into<String>, description: Option<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            description: description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Render the prompt around a tool listing (see `ToolRegistry::describe`).
    pub fn build(&self, tools_list: &str) -> String {
        let id = &self.agent_id;
        let description = &self.description;

        format!(
            r#"Your id: {id}
Your description: {description}

You are an AI agent operating in a strict ReAct loop: THINK → ACT → OBSERVE → REPEAT.

{tools_list}

REQUIRED TAGS IN EVERY RESPONSE:
- <thought>: Your reasoning about what to do next
- <action>: Name of tool to use, or 'finalize' to end
- <parameter>: Input data for the tool (can contain nested tags or JSON)

WHEN ACTION IS 'finalize':
- <final_answer>: REQUIRED. Your complete response to the user. MUST be substantive and helpful.

CRITICAL RULES:
1. EVERY response MUST include an <action> tag, with no exceptions
2. NEVER use backticks, code blocks, or ANY text outside the tags
3. Tags must be properly closed: <tag>content</tag>
4. If you can answer immediately, use 'finalize' with a complete <final_answer>
5. If you need information, use a tool, then 'finalize' with the answer
6. <final_answer> must NEVER be empty or generic; provide real value
7. ALWAYS wrap your ENTIRE response in tags; plain text is not allowed
8. Responses without an <action> tag are rejected and cost you a step

EXAMPLES:

Example 1: simple query, no tools needed
<thought>User asked for an introduction. I can answer directly without tools.</thought>
<action>finalize</action>
<final_answer>I am {id}, an AI agent built with Kine. I can help you with various tasks using my available tools.</final_answer>

Example 2: a tool is needed first
<thought>User wants the current weather. I need to use the weather tool.</thought>
<action>get_weather</action>
<parameter>
  <location>New York</location>
  <units>celsius</units>
</parameter>

After the tool returns an observation:
<thought>Got the weather data. Now I can give the final answer.</thought>
<action>finalize</action>
<final_answer>The current weather in New York is 22°C and sunny.</final_answer>

BEGIN. YOUR ENTIRE RESPONSE MUST BE TAGS ONLY. EVERY RESPONSE MUST HAVE AN <action> TAG."#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_description() {
        let builder = SystemPromptBuilder::new("helper", None);
        assert_eq!(builder.description(), DEFAULT_DESCRIPTION);
        let blank = SystemPromptBuilder::new("helper", Some("  ".into()));
        assert_eq!(blank.description(), DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_build_embeds_identity_and_tools() {
        let builder = SystemPromptBuilder::new("weather-bot", Some("Answers weather questions".into()));
        let prompt = builder.build("No tools available. Use 'finalize' to answer.");

        assert!(prompt.starts_with("Your id: weather-bot\nYour description: Answers weather questions"));
        assert!(prompt.contains("No tools available. Use 'finalize' to answer."));
        assert!(prompt.contains("I am weather-bot, an AI agent built with Kine."));
        assert!(prompt.contains("<final_answer>: REQUIRED"));
        assert!(prompt.ends_with("MUST HAVE AN <action> TAG."));
    }
}
