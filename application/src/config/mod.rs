//! Application-level configuration.
//!
//! - [`PlannerParams`]: planner loop control (model, budget, heartbeat)
//! - [`PipelineParams`]: per-unit retry budget and optional phases

pub mod pipeline_params;
pub mod planner_params;

pub use pipeline_params::PipelineParams;
pub use planner_params::PlannerParams;
