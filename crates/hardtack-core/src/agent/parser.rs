//! Extraction of function calls from model output

use crate::error::{HardtackError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key whose presence marks a call block
const CALL_KEY: &str = "\"function_name\"";

/// A function invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of scanning model output
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCall {
    Call(ToolCall),
    /// Plain conversation, no call requested
    NoCall,
}

/// Scan model output for a call block
///
/// Text without a `"function_name"` key is conversation. Otherwise every
/// occurrence of the key is tried in order and the first well-formed block
/// wins; when none is usable the result is `MalformedCall`.
pub fn parse_tool_call(text: &str) -> Result<ParsedCall> {
    let mut seen_key = false;
    let mut first_block = None;
    let mut unusable_call = None;
    for (key_pos, _) in text.match_indices(CALL_KEY) {
        seen_key = true;
        for (start, end) in enclosing_spans(text, key_pos) {
            let block = &text[start..end];
            first_block.get_or_insert(block);
            if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(block) {
                if object.contains_key("function_name") {
                    match decode_call(object) {
                        Some(call) => return Ok(ParsedCall::Call(call)),
                        None => {
                            unusable_call.get_or_insert(block);
                            break;
                        }
                    }
                }
            }
        }
    }

    if !seen_key {
        return Ok(ParsedCall::NoCall);
    }
    Err(HardtackError::malformed(
        unusable_call.or(first_block).unwrap_or(text),
    ))
}

/// Names are taken verbatim; an empty or blank name is unusable
fn decode_call(object: Map<String, Value>) -> Option<ToolCall> {
    let name = match object.get("function_name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
        _ => return None,
    };
    let arguments = match object.get("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(arguments)) => arguments.clone(),
        Some(_) => return None,
    };
    Some(ToolCall { name, arguments })
}

/// Render a call in the block format the model is asked to produce
pub fn encode_tool_call(call: &ToolCall) -> String {
    let block = serde_json::json!({
        "function_name": call.name,
        "arguments": Value::Object(call.arguments.clone()),
    });
    let body = serde_json::to_string_pretty(&block).unwrap_or_else(|_| block.to_string());
    format!("```json\n{}\n```", body)
}

/// Remove the call block (and its code fence) from model output
///
/// Returns the surrounding prose, trimmed. Text without a call is returned as is.
pub fn strip_call_block(text: &str) -> String {
    let Some(key_pos) = text.find(CALL_KEY) else {
        return text.trim().to_string();
    };
    let (start, end) = match enclosing_spans(text, key_pos).next() {
        Some(span) => span,
        None => match text[..key_pos].rfind('{') {
            Some(start) => (start, text.len()),
            None => (key_pos, text.len()),
        },
    };

    let before = text[..start].trim_end();
    let before = before
        .strip_suffix("```json")
        .or_else(|| before.strip_suffix("```"))
        .unwrap_or(before);
    let after = text[end..].trim_start();
    let after = after.strip_prefix("```").unwrap_or(after);

    format!("{} {}", before.trim(), after.trim())
        .trim()
        .to_string()
}

/// Balanced `{...}` spans that contain `key_pos`, innermost first
fn enclosing_spans(text: &str, key_pos: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
    text[..key_pos]
        .rmatch_indices('{')
        .filter_map(move |(start, _)| {
            balanced_end(text.as_bytes(), start)
                .filter(|&end| end > key_pos)
                .map(|end| (start, end))
        })
}

/// Position just past the `}` balancing the `{` at `start`
///
/// Braces inside string literals are skipped.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}
