//! Parse-then-fallback chain for model-produced tool arguments.
//!
//! Tiers, tried in order:
//!
//! 1. **Exact**: the text is a JSON object (or a JSON string holding one).
//! 2. **Repaired**: structural fixes: strip code fences and surrounding
//!    prose, swap single quotes when no double quotes are present, drop
//!    trailing commas, close unterminated strings, arrays and objects.
//! 3. **EmptyFallback**: `{}`; typed validation downstream turns missing
//!    fields into a tool error the model can react to.
//!
//! Every tier below exact is logged.

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Which tier produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairTier {
    Exact,
    Repaired,
    EmptyFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepairedJson {
    /// Always a JSON object.
    pub value: Value,
    pub tier: RepairTier,
}

/// Run the repair chain over raw tool arguments.
pub fn repair(raw: &str) -> RepairedJson {
    if let Some(value) = parse_object(raw) {
        return RepairedJson {
            value,
            tier: RepairTier::Exact,
        };
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        debug!("Tool arguments empty, using empty object");
        return empty();
    }

    if let Some(value) = structural_repair(trimmed) {
        warn!(
            "Tool arguments were malformed and structurally repaired ({} bytes)",
            raw.len()
        );
        return RepairedJson {
            value,
            tier: RepairTier::Repaired,
        };
    }

    warn!(
        "Tool arguments could not be repaired, falling back to empty object: {}",
        crate::core::string::truncate(trimmed, 120)
    );
    empty()
}

fn empty() -> RepairedJson {
    RepairedJson {
        value: Value::Object(Map::new()),
        tier: RepairTier::EmptyFallback,
    }
}

fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text).ok()? {
        v @ Value::Object(_) => Some(v),
        // double-encoded: "{\"a\":1}"
        Value::String(inner) => match serde_json::from_str::<Value>(&inner).ok()? {
            v @ Value::Object(_) => Some(v),
            _ => None,
        },
        _ => None,
    }
}

fn structural_repair(text: &str) -> Option<Value> {
    let mut candidate = strip_code_fence(text);

    let start = candidate.find('{')?;
    candidate = candidate[start..].to_string();

    if !candidate.contains('"') && candidate.contains('\'') {
        candidate = candidate.replace('\'', "\"");
    }

    if let Some(v) = parse_object(&candidate) {
        return Some(v);
    }

    let without_commas = remove_trailing_commas(&candidate);
    if let Some(v) = parse_object(&without_commas) {
        return Some(v);
    }

    let closed = close_structure(&without_commas);
    parse_object(&remove_trailing_commas(&closed))
}

fn strip_code_fence(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.first().is_some_and(|l| l.trim_start().starts_with("```")) {
        lines
            .iter()
            .skip(1)
            .filter(|l| l.trim() != "```")
            .copied()
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        text.to_string()
    }
}

/// Drop commas that directly precede `}` or `]` (outside strings).
fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Close an unterminated string and any open arrays/objects. Text after the
/// top-level object closes is discarded.
fn close_structure(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        out.push(c);
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
                if stack.is_empty() {
                    return out;
                }
            }
            _ => {}
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }

    let tail = out.trim_end();
    if tail.ends_with(':') {
        out = format!("{} null", tail);
    } else if tail.ends_with(',') {
        out = tail[..tail.len() - 1].to_string();
    }

    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_object_passes_through() {
        let repaired = repair(r#"{"query": "tides"}"#);
        assert_eq!(repaired.tier, RepairTier::Exact);
        assert_eq!(repaired.value, json!({"query": "tides"}));
    }

    #[test]
    fn double_encoded_object_is_exact() {
        let repaired = repair(r#""{\"prompt\":\"go\"}""#);
        assert_eq!(repaired.tier, RepairTier::Exact);
        assert_eq!(repaired.value["prompt"], "go");
    }

    #[test]
    fn trailing_commas_are_removed() {
        let repaired = repair(r#"{"units": [{"prompt": "a",}, ], }"#);
        assert_eq!(repaired.tier, RepairTier::Repaired);
        assert_eq!(repaired.value["units"][0]["prompt"], "a");
    }

    #[test]
    fn truncated_payload_is_closed() {
        let repaired = repair(r#"{"theme": "Ocean", "units": [{"prompt": "waves"#);
        assert_eq!(repaired.tier, RepairTier::Repaired);
        assert_eq!(repaired.value["units"][0]["prompt"], "waves");
    }

    #[test]
    fn dangling_key_becomes_null() {
        let repaired = repair(r#"{"query": "x", "limit":"#);
        assert_eq!(repaired.tier, RepairTier::Repaired);
        assert_eq!(repaired.value["limit"], Value::Null);
    }

    #[test]
    fn fenced_and_prose_wrapped_payload() {
        let raw = "```json\n{\"prompt\": \"final\"}\n```";
        assert_eq!(repair(raw).value["prompt"], "final");

        let prose = "Here you go: {\"query\": \"q\"} hope that helps";
        let repaired = repair(prose);
        assert_eq!(repaired.tier, RepairTier::Repaired);
        assert_eq!(repaired.value["query"], "q");
    }

    #[test]
    fn single_quotes_are_swapped() {
        let repaired = repair("{'query': 'volcanoes'}");
        assert_eq!(repaired.value["query"], "volcanoes");
    }

    #[test]
    fn garbage_falls_back_to_empty_object() {
        let repaired = repair("definitely not json");
        assert_eq!(repaired.tier, RepairTier::EmptyFallback);
        assert_eq!(repaired.value, json!({}));

        let array = repair("[1, 2, 3]");
        assert_eq!(array.tier, RepairTier::EmptyFallback);
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let repaired = repair(r#"{"prompt": "use {curly} braces", "x": [1, 2"#);
        assert_eq!(repaired.value["prompt"], "use {curly} braces");
        assert_eq!(repaired.value["x"], json!([1, 2]));
    }
}
