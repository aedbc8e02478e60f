//! Port for the planner conversation transcript.
//!
//! Separate from `tracing` diagnostics: this captures the model turns and
//! tool traffic of a planning run in a machine-readable form (JSONL in the
//! infrastructure adapter).

use serde_json::{Value, json};

/// A structured transcript event.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationEvent {
    /// `llm_response`, `tool_call`, `tool_result`, `planning_complete`, ...
    pub event_type: &'static str,
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    pub fn llm_response(iteration: usize, text: &str, tool_calls: usize) -> Self {
        Self::new(
            "llm_response",
            json!({ "iteration": iteration, "text": text, "tool_calls": tool_calls }),
        )
    }

    pub fn tool_call(iteration: usize, tool: &str, arguments: &str) -> Self {
        Self::new(
            "tool_call",
            json!({ "iteration": iteration, "tool": tool, "arguments": arguments }),
        )
    }

    pub fn tool_result(iteration: usize, tool: &str, success: bool, output: &str) -> Self {
        Self::new(
            "tool_result",
            json!({ "iteration": iteration, "tool": tool, "success": success, "output": output }),
        )
    }
}

/// Logging is synchronous and infallible from the caller's side; adapters
/// swallow their own I/O errors.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
