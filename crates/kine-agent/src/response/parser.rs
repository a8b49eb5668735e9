//! Tag scanner for model responses.
//!
//! Expected shape:
//!
//! ```text
//! <thought>...</thought>
//! <action>tool_name | finalize</action>
//! <parameter>{"json": true} | <key>value</key>...</parameter>
//! <final_answer>...</final_answer>
//! ```
//!
//! Text without any of the main tags goes through a plain-text heuristic.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use kine_core::utils::char_prefix;

use super::{FormatError, ParsedDecision};
use crate::steps::FINALIZE;

/// Plain text shorter than this (in chars) is not taken as an answer.
const MIN_PLAIN_ANSWER_LEN: usize = 10;

/// Length of the raw-text excerpt used as the thought of a plain response.
const THOUGHT_EXCERPT_LEN: usize = 100;

static THOUGHT_TAG: LazyLock<Regex> = LazyLock::new(|| tag_regex("thought"));
static ACTION_TAG: LazyLock<Regex> = LazyLock::new(|| tag_regex("action"));
static PARAMETER_TAG: LazyLock<Regex> = LazyLock::new(|| tag_regex("parameter"));
static FINAL_ANSWER_TAG: LazyLock<Regex> = LazyLock::new(|| tag_regex("final_answer"));
static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<(\w+)>").unwrap());

/// `<tag>...</tag>`, case-insensitive, tolerating whitespace inside the
/// brackets (`< action >`, `</ action>`).
fn tag_regex(tag: &str) -> Regex {
    Regex::new(&format!(r"(?is)<\s*{tag}\s*>(.*?)<\s*/\s*{tag}\s*>")).unwrap()
}

/// Parse a tagged response, falling back to plain-text detection.
pub fn parse_tagged(raw: &str, tool_names: &[String]) -> Result<ParsedDecision, FormatError> {
    if raw.trim().is_empty() {
        return Err(FormatError::EmptyResponse);
    }

    let thought = extract_tag(raw, &THOUGHT_TAG);
    let action = extract_tag(raw, &ACTION_TAG);
    let final_answer = extract_tag(raw, &FINAL_ANSWER_TAG);

    if thought.is_none() && action.is_none() && final_answer.is_none() {
        return Ok(parse_plain_text(raw, tool_names));
    }

    Ok(ParsedDecision {
        thought,
        action,
        parameter: extract_tag(raw, &PARAMETER_TAG).map(|p| parse_parameter(&p)),
        final_answer,
    })
}

/// Content of the first match of `tag`, trimmed. Empty counts as absent.
fn extract_tag(content: &str, tag: &Regex) -> Option<String> {
    let inner = tag.captures(content)?.get(1)?.as_str().trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

/// Decode a `<parameter>` segment.
///
/// Tried in order: the whole segment as JSON, then one level of
/// `<key>value</key>` pairs, then the trimmed text itself.
pub fn parse_parameter(segment: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(segment) {
        return value;
    }

    let fields = parse_inner_tags(segment);
    if fields.is_empty() {
        Value::String(segment.trim().to_string())
    } else {
        Value::Object(fields)
    }
}

/// `<key>value</key>` pairs, one level deep. Each value is JSON-decoded when
/// possible, else kept as trimmed text. Empty values are skipped.
fn parse_inner_tags(segment: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    let mut pos = 0;
    while let Some(caps) = OPEN_TAG.captures_at(segment, pos) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let name = name.as_str();
        let body_start = whole.end();
        let closing = format!("</{name}>");

        match segment[body_start..].find(&closing) {
            Some(len) => {
                let body = &segment[body_start..body_start + len];
                if !body.is_empty() {
                    fields.insert(name.to_string(), decode_value(body));
                }
                pos = body_start + len + closing.len();
            }
            // Unclosed: rescan from just past this `<`.
            None => pos = whole.start() + 1,
        }
    }

    fields
}

fn decode_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.trim().to_string()))
}

/// Heuristic for responses that ignore the tag format.
///
/// The first registered tool name (sorted), then `finalize`, found anywhere
/// in the text (case-insensitive) becomes the action. Otherwise text longer
/// than ten characters is taken as a final answer.
pub fn parse_plain_text(raw: &str, tool_names: &[String]) -> ParsedDecision {
    let lower = raw.to_lowercase();

    let mut candidates: Vec<&str> = tool_names.iter().map(String::as_str).collect();
    candidates.sort_unstable();
    candidates.push(FINALIZE);

    let mut action = candidates
        .into_iter()
        .find(|name| !name.is_empty() && lower.contains(&name.to_lowercase()))
        .map(String::from);

    if action.is_none() && raw.chars().count() > MIN_PLAIN_ANSWER_LEN {
        action = Some(FINALIZE.to_string());
    }

    let final_answer = match action.as_deref() {
        Some(FINALIZE) => Some(raw.trim().to_string()),
        _ => None,
    };

    ParsedDecision {
        thought: Some(format!("{}...", char_prefix(raw, THOUGHT_EXCERPT_LEN))),
        action,
        parameter: None,
        final_answer,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
