//! Reasoning-model session types.
//!
//! - [`response`]: structured model turns (text + tool calls)
//! - [`stream`]: incremental events of a streamed turn and their accumulator

pub mod response;
pub mod stream;
