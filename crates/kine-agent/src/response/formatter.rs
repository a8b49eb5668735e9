//! The two response formats the agent understands.

use super::parser::{parse_plain_text, parse_tagged};
use super::{FormatError, ParsedDecision, ResponseFormatter};

/// `<thought>` / `<action>` / `<parameter>` / `<final_answer>` tags, with a
/// plain-text fallback for responses that ignore them. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaggedFormatter;

impl ResponseFormatter for TaggedFormatter {
    fn parse(&self, raw: &str, tool_names: &[String]) -> Result<ParsedDecision, FormatError> {
        parse_tagged(raw, tool_names)
    }
}

/// Plain-text heuristic only; tags are not interpreted.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextFormatter;

impl ResponseFormatter for PlainTextFormatter {
    fn parse(&self, raw: &str, tool_names: &[String]) -> Result<ParsedDecision, FormatError> {
        if raw.trim().is_empty() {
            return Err(FormatError::EmptyResponse);
        }
        Ok(parse_plain_text(raw, tool_names))
    }
}
