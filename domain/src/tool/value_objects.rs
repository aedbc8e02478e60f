//! Tool result and error values fed back to the planner model.
//!
//! Every executed tool call yields a [`ToolResult`]. Failures are not
//! surfaced to the end user; they travel back to the model as a failed
//! result so it can adjust its next call.

use serde::{Deserialize, Serialize};

/// Error reported to the model for a failed tool call.
///
/// | Code | Meaning |
/// |------|---------|
/// | `INVALID_ARGUMENT` | Arguments missing, malformed or out of range |
/// | `NOT_FOUND` | Unknown tool or unit |
/// | `PRECONDITION_FAILED` | Tool called out of order (e.g. chart before plan) |
/// | `PLAN_FINALIZED` | Plan mutation after finalize |
/// | `EXECUTION_FAILED` | External failure (search backend, I/O) |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message)
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", format!("Not found: {}", what.into()))
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new("PRECONDITION_FAILED", message)
    }

    pub fn plan_finalized() -> Self {
        Self::new(
            "PLAN_FINALIZED",
            "The plan is finalized and can no longer be changed",
        )
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("EXECUTION_FAILED", message)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Outcome of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToolResult {
    pub fn success(tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: Some(output.into()),
            error: None,
            duration_ms: None,
        }
    }

    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: None,
            error: Some(error),
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    /// Text sent back to the model as the tool message content.
    pub fn content_for_model(&self) -> String {
        match (&self.output, &self.error) {
            (Some(output), _) if self.success => output.clone(),
            (_, Some(error)) => format!("Error: {}", error),
            _ => String::new(),
        }
    }
}
