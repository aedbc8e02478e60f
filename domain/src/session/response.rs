//! LLM response types for the tool-calling planner.
//!
//! A model turn is an array of content blocks mixing reasoning text and
//! tool calls. Tool-call arguments are kept as the raw JSON text the model
//! produced: the planner decides how to parse (and repair) them, so a
//! malformed payload never fails at the transport boundary.

use serde::{Deserialize, Serialize};

/// A single block of content within an LLM response.
///
/// # Examples
///
/// ```
/// use atelier_domain::session::response::ContentBlock;
///
/// let text = ContentBlock::Text("Outlining five scenes.".to_string());
/// assert!(text.as_text().is_some());
///
/// let tool = ContentBlock::ToolUse {
///     id: "call_1".to_string(),
///     name: "web_search".to_string(),
///     arguments: r#"{"query":"aurora borealis facts"}"#.to_string(),
/// };
/// assert!(tool.as_tool_use().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentBlock {
    /// Reasoning or prose from the model.
    Text(String),

    /// A tool call requested by the model.
    ToolUse {
        /// Provider-assigned id used to correlate the tool result.
        id: String,
        /// Tool name as emitted by the model (not yet validated).
        name: String,
        /// Raw JSON arguments, possibly malformed.
        arguments: String,
    },
}

impl ContentBlock {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `(id, name, arguments)` if this is a `ToolUse` block.
    pub fn as_tool_use(&self) -> Option<(&str, &str, &str)> {
        match self {
            ContentBlock::ToolUse {
                id,
                name,
                arguments,
            } => Some((id, name, arguments)),
            _ => None,
        }
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of the turn.
    EndTurn,
    /// The model wants tools executed and results sent back.
    ToolUse,
    /// Token limit reached; content may be truncated.
    MaxTokens,
    Other(String),
}

impl StopReason {
    /// Map an OpenAI-style `finish_reason`.
    pub fn from_finish_reason(reason: &str) -> Self {
        match reason {
            "stop" | "end_turn" => StopReason::EndTurn,
            "tool_calls" | "tool_use" | "function_call" => StopReason::ToolUse,
            "length" | "max_tokens" => StopReason::MaxTokens,
            other => StopReason::Other(other.to_string()),
        }
    }
}

/// A tool call extracted from a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// A structured model turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<StopReason>,
    pub model: Option<String>,
}

impl LlmResponse {
    /// Create a text-only response.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text(text.into())],
            stop_reason: Some(StopReason::EndTurn),
            model: None,
        }
    }

    /// Convenience builder used by adapters and scripted sessions.
    pub fn with_tool_call(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        self.content.push(ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        });
        self.stop_reason = Some(StopReason::ToolUse);
        self
    }

    /// Concatenate all text blocks.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| b.as_text())
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse {
                    id,
                    name,
                    arguments,
                } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: arguments.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }
}
