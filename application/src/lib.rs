//! Application layer for atelier
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{PipelineParams, PlannerParams};
pub use ports::{
    assembler::{Assembler, AssemblyRequest, Segment},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    events::{DEFAULT_EVENT_BUFFER, EventEmitter},
    llm_gateway::{GatewayError, LlmGateway, LlmSession, StreamHandle, ToolResultMessage},
    provider_client::ProviderClient,
    run_store::{InMemoryRunStore, RunStore, RunStoreError},
    search::{SearchProvider, SearchResult},
};
pub use use_cases::plan_generation::{PlanGenerationUseCase, PlannerError, PlanningOutcome};
pub use use_cases::poll_job::{JobPoller, PollError, PollPolicy};
pub use use_cases::rate_limit::{
    QueueError, QueuePermit, QueueStatus, RateLimitPolicy, RateLimitedQueue,
};
pub use use_cases::run_launcher::{RunHandle, RunLauncher};
pub use use_cases::run_pipeline::{
    GenerationPipeline, PipelineError, PipelineReport, ProviderRoute, ProviderRoutes,
};
pub use use_cases::shared::Cancelled;
