//! Domain layer for atelier
//!
//! Pure types with no I/O: the plan being built, the units it contains,
//! provider jobs, planner state, tool invocations and the progress events a
//! run emits.
//!
//! # Core Concepts
//!
//! ## Plan and Units
//!
//! A [`GenerationPlan`] is an ordered list of [`Unit`]s (slides, scenes)
//! plus global settings. The planner mutates it through tool calls until
//! `finalize_prompt` freezes it.
//!
//! ## Jobs
//!
//! A [`Job`] tracks one request to an external provider. Jobs are
//! append-only; retries spawn a new job.

pub mod agent;
pub mod core;
pub mod event;
pub mod job;
pub mod plan;
pub mod prompt;
pub mod provider;
pub mod run;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use agent::{AgentState, CollectedMaterial, FinalizeOutcome, DEFAULT_MAX_ITERATIONS};
pub use core::{error::DomainError, model::Model};
pub use event::{AssetStage, PipelinePhase, ProgressEvent, UnitFailure};
pub use job::{Job, JobId, JobStatus};
pub use plan::{
    chart::{ChartSpec, ChartType, DataPoint},
    entities::{AssetStatus, GenerationPlan, Unit, UnitDraft, UnitImageConfig},
    settings::{AspectRatio, GlobalSettings, TransitionStyle},
};
pub use prompt::PlannerPromptTemplate;
pub use provider::{
    JobPoll, ProviderError, ProviderErrorKind, ProviderKey, ProviderKind, ProviderRequest,
    RemoteStatus, Submission,
};
pub use run::{
    GenerationRequest, ReferenceAsset, RunId, RunPhase, RunSnapshot, UnitOutcome, UnitRecord,
};
pub use session::{
    response::{ContentBlock, LlmResponse, StopReason, ToolCall},
    stream::{StreamAccumulator, StreamEvent},
};
pub use tool::{
    ChartDataArgs, FinalizeArgs, PlanStructureArgs, ToolArgumentError, ToolDefinition,
    ToolError, ToolInvocation, ToolKind, ToolResult, WebSearchArgs,
};
