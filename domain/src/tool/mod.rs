//! Planner tool system.
//!
//! The planner exposes a closed set of tools to the reasoning model.
//! Dispatch is an exhaustive `match` over [`ToolInvocation`], so adding a
//! tool means adding a [`ToolKind`] variant and the compiler points at every
//! place that must handle it.
//!
//! ```text
//! ToolCall (raw name + raw JSON)
//!     │  ToolKind::resolve(name)         unknown name   -> ToolArgumentError
//!     │  json_repair::repair(arguments)  exact | repaired | empty-object fallback
//!     │  serde into typed args           missing fields -> ToolArgumentError
//!     ▼
//! ToolInvocation ──execute──▶ ToolResult (fed back to the model)
//! ```

pub mod entities;
pub mod invocation;
pub mod json_repair;
pub mod kind;
pub mod value_objects;

pub use entities::{ToolDefinition, ToolParameter};
pub use invocation::{
    ChartDataArgs, FinalizeArgs, PlanStructureArgs, ToolArgumentError, ToolInvocation,
    WebSearchArgs,
};
pub use json_repair::{RepairTier, RepairedJson};
pub use kind::ToolKind;
pub use value_objects::{ToolError, ToolResult};
