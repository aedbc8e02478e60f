//! Planner working memory.

pub mod state;
pub mod value_objects;

pub use state::{AgentState, DEFAULT_MAX_ITERATIONS};
pub use value_objects::{CollectedMaterial, FinalizeOutcome, Thought, ToolLogEntry};
