//! Prompt templates

pub mod planner;

pub use planner::PlannerPromptTemplate;
