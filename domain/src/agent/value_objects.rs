//! Agent value objects: thoughts, collected materials and the tool log.

use serde::{Deserialize, Serialize};

/// A recorded reasoning step of the planner model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thought {
    pub iteration: usize,
    pub content: String,
}

/// Research material gathered during planning (search results, notes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedMaterial {
    /// Where the material came from, e.g. `web_search: "query"` or `reference`.
    pub source: String,
    pub content: String,
}

/// One executed tool call, kept for diagnostics of incomplete runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolLogEntry {
    pub iteration: usize,
    pub tool: String,
    pub success: bool,
    pub summary: String,
}

/// Result of a finalize request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The plan was frozen by this call.
    Finalized(String),
    /// The plan was already frozen; carries the brief from the first call.
    AlreadyFinalized(String),
}

impl FinalizeOutcome {
    pub fn brief(&self) -> &str {
        match self {
            FinalizeOutcome::Finalized(b) | FinalizeOutcome::AlreadyFinalized(b) => b,
        }
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self, FinalizeOutcome::AlreadyFinalized(_))
    }
}
