//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod assembler;
pub mod conversation_logger;
pub mod events;
pub mod llm_gateway;
pub mod provider_client;
pub mod run_store;
pub mod search;
