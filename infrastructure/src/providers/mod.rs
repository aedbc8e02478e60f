//! Remote model adapters
//!
//! - [`openai`]: the reasoning model behind the planner
//! - [`generation`]: image, video and speech job providers

pub mod generation;
pub mod openai;
