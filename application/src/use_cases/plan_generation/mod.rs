//! Plan generation use case: the tool-calling planner loop.
//!
//! Drives the reasoning model through "think, call a tool, observe" turns
//! until it calls `finalize_prompt` or the iteration budget runs out.
//!
//! ```text
//! initial message ──▶ model turn ──┬─ no tool call ──▶ nudge (costs an iteration)
//!                                   └─ tool calls ───▶ execute each ──▶ results ──▶ model turn
//!                                                         │
//!                                                         └─ finalize succeeded ──▶ done
//! ```
//!
//! Malformed tool arguments and tool failures go back to the model as tool
//! results. Only gateway failures, cancellation and an exhausted budget end
//! the loop with an error, and those carry the partial [`AgentState`].

mod tools;

use crate::config::PlannerParams;
use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger};
use crate::ports::events::EventEmitter;
use crate::ports::llm_gateway::{GatewayError, LlmGateway, LlmSession, ToolResultMessage};
use crate::ports::search::SearchProvider;
use crate::use_cases::heartbeat::HeartbeatGuard;
use crate::use_cases::shared::{Cancelled, check_cancelled};
use atelier_domain::tool::json_repair;
use atelier_domain::{
    AgentState, DomainError, GenerationPlan, GenerationRequest, LlmResponse, PlannerPromptTemplate,
    ProgressEvent, ToolKind,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tools::PlannerTools;
use tracing::{debug, info, warn};

/// Characters of each collected material repeated in a nudge.
const NUDGE_MATERIAL_CHARS: usize = 300;

/// Errors that end a planning run.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] DomainError),

    #[error("Planning incomplete: no finalize_prompt after {} iterations", .state.iteration)]
    PlanningIncomplete { state: Box<AgentState> },

    #[error("Reasoning model error: {source}")]
    Gateway {
        #[source]
        source: GatewayError,
        state: Box<AgentState>,
    },

    #[error("Planning cancelled")]
    Cancelled,
}

impl PlannerError {
    /// Partial state for diagnostics, when the loop got that far.
    pub fn state(&self) -> Option<&AgentState> {
        match self {
            PlannerError::PlanningIncomplete { state } | PlannerError::Gateway { state, .. } => {
                Some(state)
            }
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PlannerError::Cancelled)
    }
}

impl From<Cancelled> for PlannerError {
    fn from(_: Cancelled) -> Self {
        PlannerError::Cancelled
    }
}

/// A finalized plan plus the loop's final state.
#[derive(Debug, Clone)]
pub struct PlanningOutcome {
    pub plan: GenerationPlan,
    pub brief: String,
    pub state: AgentState,
}

/// What the next model turn sends.
enum Turn {
    User(String),
    ToolResults(Vec<ToolResultMessage>),
}

pub struct PlanGenerationUseCase {
    gateway: Arc<dyn LlmGateway>,
    search: Option<Arc<dyn SearchProvider>>,
    conversation_logger: Arc<dyn ConversationLogger>,
    params: PlannerParams,
}

impl PlanGenerationUseCase {
    pub fn new(gateway: Arc<dyn LlmGateway>, params: PlannerParams) -> Self {
        Self {
            gateway,
            search: None,
            conversation_logger: Arc::new(NoConversationLogger),
            params,
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn params(&self) -> &PlannerParams {
        &self.params
    }

    pub async fn execute(
        &self,
        request: &GenerationRequest,
        emitter: &EventEmitter,
        cancellation: &CancellationToken,
    ) -> Result<PlanningOutcome, PlannerError> {
        request.validate()?;
        check_cancelled::<PlannerError>(cancellation)?;

        let mut state = AgentState::new(request.goal.clone(), self.params.max_iterations)
            .with_style(request.style.clone());
        for asset in &request.reference_assets {
            let content = match &asset.description {
                Some(desc) => format!("{} ({})", asset.url, desc),
                None => asset.url.clone(),
            };
            state.add_material("reference", content);
        }

        info!(
            "Planning with {} (budget {} iterations)",
            self.params.model, self.params.max_iterations
        );
        let session = match self
            .gateway
            .create_session(
                &self.params.model,
                &PlannerPromptTemplate::system(self.params.max_iterations),
            )
            .await
        {
            Ok(session) => session,
            Err(source) => {
                return Err(PlannerError::Gateway {
                    source,
                    state: Box::new(state),
                });
            }
        };

        let iteration = Arc::new(AtomicUsize::new(0));
        let _heartbeat = HeartbeatGuard::spawn(
            emitter.clone(),
            self.params.heartbeat_interval,
            Arc::clone(&iteration),
        );

        let tools = PlannerTools::new(self.search.as_deref(), self.params.search_limit);
        let api_tools = ToolKind::api_tools();
        let mut turn = Turn::User(PlannerPromptTemplate::initial_message(request));

        loop {
            check_cancelled::<PlannerError>(cancellation)?;
            if !state.begin_iteration() {
                warn!(
                    "Iteration budget of {} exhausted without finalize",
                    state.max_iterations
                );
                self.conversation_logger.log(ConversationEvent::new(
                    "planning_incomplete",
                    json!({ "iterations": state.iteration }),
                ));
                return Err(PlannerError::PlanningIncomplete {
                    state: Box::new(state),
                });
            }
            iteration.store(state.iteration, Ordering::Relaxed);
            debug!("Planner iteration {}/{}", state.iteration, state.max_iterations);

            let response = match self
                .model_turn(session.as_ref(), &turn, &api_tools, emitter)
                .await
            {
                Ok(response) => response,
                Err(source) => {
                    return Err(PlannerError::Gateway {
                        source,
                        state: Box::new(state),
                    });
                }
            };

            let text = response.text_content();
            let calls = response.tool_calls();
            self.conversation_logger.log(ConversationEvent::llm_response(
                state.iteration,
                &text,
                calls.len(),
            ));
            state.add_thought(text);

            if calls.is_empty() {
                debug!("No tool call at iteration {}, nudging", state.iteration);
                turn = Turn::User(PlannerPromptTemplate::nudge(
                    state.remaining_iterations(),
                    state.plan.is_some(),
                    &state.materials_digest(NUDGE_MATERIAL_CHARS),
                ));
                continue;
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                check_cancelled::<PlannerError>(cancellation)?;

                emitter
                    .emit(ProgressEvent::Action {
                        tool: call.name.clone(),
                        input: json_repair::repair(&call.arguments).value,
                    })
                    .await;
                self.conversation_logger.log(ConversationEvent::tool_call(
                    state.iteration,
                    &call.name,
                    &call.arguments,
                ));

                let result = tools.execute(&mut state, call).await;
                let content = result.content_for_model();

                emitter
                    .emit(ProgressEvent::Observation {
                        tool: call.name.clone(),
                        success: result.is_success(),
                        result: content.clone(),
                    })
                    .await;
                self.conversation_logger.log(ConversationEvent::tool_result(
                    state.iteration,
                    &call.name,
                    result.is_success(),
                    &content,
                ));

                results.push(ToolResultMessage {
                    tool_use_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    output: content,
                    is_error: !result.is_success(),
                });

                if state.is_complete {
                    break;
                }
            }

            if state.is_complete {
                return self.complete(state, emitter).await;
            }
            turn = Turn::ToolResults(results);
        }
    }

    async fn model_turn(
        &self,
        session: &dyn LlmSession,
        turn: &Turn,
        api_tools: &[serde_json::Value],
        emitter: &EventEmitter,
    ) -> Result<LlmResponse, GatewayError> {
        let handle = match turn {
            Turn::User(content) => session.send_with_tools_streaming(content, api_tools).await?,
            Turn::ToolResults(results) => session.send_tool_results_streaming(results).await?,
        };
        handle.collect_response(|chunk| emitter.emit_thought(chunk)).await
    }

    async fn complete(
        &self,
        state: AgentState,
        emitter: &EventEmitter,
    ) -> Result<PlanningOutcome, PlannerError> {
        let (Some(plan), Some(brief)) = (state.plan.clone(), state.final_brief.clone()) else {
            // finalize always sets both; treat anything else as an unfinished run
            return Err(PlannerError::PlanningIncomplete {
                state: Box::new(state),
            });
        };
        info!(
            "Plan finalized after {} iteration(s): {} unit(s)",
            state.iteration,
            plan.units.len()
        );
        self.conversation_logger.log(ConversationEvent::new(
            "planning_complete",
            json!({
                "iterations": state.iteration,
                "units": plan.units.len(),
                "brief": brief,
            }),
        ));
        emitter
            .emit(ProgressEvent::PromptReady {
                prompt: brief.clone(),
                units: plan.units.len(),
            })
            .await;
        Ok(PlanningOutcome { plan, brief, state })
    }
}
