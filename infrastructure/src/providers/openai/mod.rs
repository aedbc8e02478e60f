//! OpenAI-compatible chat completions provider
//!
//! Drives the planner through any endpoint that speaks the
//! `/chat/completions` wire format (OpenAI, Azure OpenAI, vLLM, Ollama,
//! LiteLLM). Tool-call arguments are forwarded as the raw string the model
//! produced.

mod gateway;
mod session;
mod stream;
mod types;

pub use gateway::{OpenAiCompatConfig, OpenAiCompatGateway};
