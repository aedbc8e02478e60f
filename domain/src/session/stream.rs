//! Streaming events for reasoning-model turns.
//!
//! Adapters translate transport chunks (SSE lines, JSON-RPC notifications)
//! into [`StreamEvent`]s. [`StreamAccumulator`] folds those events back into
//! a complete [`LlmResponse`], concatenating tool-call argument fragments by
//! their index.

use super::response::{ContentBlock, LlmResponse, StopReason};
use std::collections::BTreeMap;

/// An event in a streamed model turn.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A reasoning/text chunk.
    Delta(String),
    /// Text-only completion (signals stream end).
    Completed(String),
    /// Transport or provider error (signals stream end).
    Error(String),

    /// Incremental tool call data.
    ///
    /// The first delta for an index usually carries `id` and `name`; later
    /// ones carry `arguments_delta` fragments to be concatenated.
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments_delta: Option<String>,
    },

    /// The full structured turn (signals stream end).
    CompletedResponse(LlmResponse),
}

impl StreamEvent {
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(s) | StreamEvent::Completed(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::Completed(_) | StreamEvent::Error(_) | StreamEvent::CompletedResponse(_)
        )
    }
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Folds streamed deltas into a complete [`LlmResponse`].
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    tool_calls: BTreeMap<usize, PartialToolCall>,
    stop_reason: Option<StopReason>,
    model: Option<String>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    pub fn push_tool_delta(
        &mut self,
        index: usize,
        id: Option<&str>,
        name: Option<&str>,
        arguments_delta: Option<&str>,
    ) {
        let entry = self.tool_calls.entry(index).or_default();
        if let Some(id) = id.filter(|s| !s.is_empty()) {
            entry.id = Some(id.to_string());
        }
        if let Some(name) = name.filter(|s| !s.is_empty()) {
            entry.name = Some(name.to_string());
        }
        if let Some(fragment) = arguments_delta {
            entry.arguments.push_str(fragment);
        }
    }

    /// Apply one non-terminal event. Terminal events are ignored.
    pub fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Delta(chunk) => self.push_text(chunk),
            StreamEvent::ToolCallDelta {
                index,
                id,
                name,
                arguments_delta,
            } => self.push_tool_delta(
                *index,
                id.as_deref(),
                name.as_deref(),
                arguments_delta.as_deref(),
            ),
            _ => {}
        }
    }

    pub fn set_stop_reason(&mut self, reason: StopReason) {
        self.stop_reason = Some(reason);
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = Some(model.into());
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Build the final response. Tool calls without a name are dropped;
    /// missing ids are synthesized from the index.
    pub fn finish(self) -> LlmResponse {
        let mut content = Vec::new();
        if !self.text.is_empty() {
            content.push(ContentBlock::Text(self.text));
        }
        let mut has_tools = false;
        for (index, call) in self.tool_calls {
            let Some(name) = call.name else {
                continue;
            };
            has_tools = true;
            content.push(ContentBlock::ToolUse {
                id: call.id.unwrap_or_else(|| format!("call_{}", index)),
                name,
                arguments: call.arguments,
            });
        }
        let stop_reason = self.stop_reason.or(Some(if has_tools {
            StopReason::ToolUse
        } else {
            StopReason::EndTurn
        }));
        LlmResponse {
            content,
            stop_reason,
            model: self.model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_not_terminal() {
        let event = StreamEvent::Delta("hello".to_string());
        assert_eq!(event.text(), Some("hello"));
        assert!(!event.is_terminal());
        assert!(StreamEvent::Error("x".to_string()).is_terminal());
    }

    #[test]
    fn accumulator_concatenates_argument_fragments() {
        let mut acc = StreamAccumulator::new();
        acc.apply(&StreamEvent::Delta("Planning ".to_string()));
        acc.apply(&StreamEvent::Delta("now.".to_string()));
        acc.apply(&StreamEvent::ToolCallDelta {
            index: 0,
            id: Some("call_a".to_string()),
            name: Some("finalize_prompt".to_string()),
            arguments_delta: Some("{\"prompt\":".to_string()),
        });
        acc.apply(&StreamEvent::ToolCallDelta {
            index: 0,
            id: None,
            name: None,
            arguments_delta: Some("\"go\"}".to_string()),
        });

        let response = acc.finish();
        assert_eq!(response.text_content(), "Planning now.");
        let calls = response.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].arguments, "{\"prompt\":\"go\"}");
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
    }

    #[test]
    fn accumulator_orders_calls_by_index_and_drops_nameless() {
        let mut acc = StreamAccumulator::new();
        acc.push_tool_delta(1, None, Some("web_search"), Some("{}"));
        acc.push_tool_delta(0, Some("c0"), Some("plan_structure"), Some("{}"));
        acc.push_tool_delta(2, Some("c2"), None, Some("{}"));

        let calls = acc.finish().tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "plan_structure");
        assert_eq!(calls[1].id, "call_1");
    }

    #[test]
    fn accumulator_text_only_ends_turn() {
        let mut acc = StreamAccumulator::new();
        acc.push_text("no tools today");
        let response = acc.finish();
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
        assert!(!response.has_tool_calls());
    }
}
