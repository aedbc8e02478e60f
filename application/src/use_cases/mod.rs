//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub(crate) mod heartbeat;
pub mod plan_generation;
pub mod poll_job;
pub mod rate_limit;
pub mod run_launcher;
pub mod run_pipeline;
pub(crate) mod shared;
