//! LLM Gateway port
//!
//! Defines the interface for communicating with the reasoning model that
//! drives the planner.

use async_trait::async_trait;
use atelier_domain::{LlmResponse, Model, StreamAccumulator, StreamEvent};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Timeout")]
    Timeout,

    #[error("Transport closed")]
    TransportClosed,

    #[error("Other error: {0}")]
    Other(String),
}

/// Gateway for LLM communication
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Create a new session with a system prompt
    async fn create_session(
        &self,
        model: &Model,
        system_prompt: &str,
    ) -> Result<Box<dyn LlmSession>, GatewayError>;
}

/// Result of one tool call, sent back to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResultMessage {
    /// Id of the tool call this answers.
    pub tool_use_id: String,
    pub tool_name: String,
    pub output: String,
    pub is_error: bool,
}

/// Handle for receiving streaming events from an LLM session.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Drain the stream into a complete response.
    ///
    /// `on_text` sees every text chunk as it arrives. A `CompletedResponse`
    /// event wins over accumulated deltas; a closed channel without a terminal
    /// event yields whatever was accumulated.
    pub async fn collect_response(
        mut self,
        mut on_text: impl FnMut(&str) + Send,
    ) -> Result<LlmResponse, GatewayError> {
        let mut acc = StreamAccumulator::new();
        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(ref chunk) => {
                    on_text(chunk);
                    acc.apply(&event);
                }
                StreamEvent::ToolCallDelta { .. } => acc.apply(&event),
                StreamEvent::Completed(text) => {
                    if acc.text().is_empty() && !text.is_empty() {
                        on_text(&text);
                        acc.push_text(&text);
                    }
                    return Ok(acc.finish());
                }
                StreamEvent::CompletedResponse(response) => return Ok(response),
                StreamEvent::Error(e) => return Err(GatewayError::RequestFailed(e)),
            }
        }
        Ok(acc.finish())
    }
}

/// An active LLM session. The session keeps its own message history.
#[async_trait]
pub trait LlmSession: Send + Sync {
    /// Get the model used by this session
    fn model(&self) -> &Model;

    /// Send a user message with the tool definitions available for this turn.
    async fn send_with_tools(
        &self,
        content: &str,
        tools: &[serde_json::Value],
    ) -> Result<LlmResponse, GatewayError>;

    /// Answer the previous turn's tool calls.
    async fn send_tool_results(
        &self,
        results: &[ToolResultMessage],
    ) -> Result<LlmResponse, GatewayError>;

    /// Streaming variant of [`send_with_tools`](Self::send_with_tools).
    ///
    /// Default implementation wraps the non-streaming call in a single
    /// `CompletedResponse` event.
    async fn send_with_tools_streaming(
        &self,
        content: &str,
        tools: &[serde_json::Value],
    ) -> Result<StreamHandle, GatewayError> {
        let response = self.send_with_tools(content, tools).await?;
        Ok(single_response_stream(response).await)
    }

    /// Streaming variant of [`send_tool_results`](Self::send_tool_results).
    async fn send_tool_results_streaming(
        &self,
        results: &[ToolResultMessage],
    ) -> Result<StreamHandle, GatewayError> {
        let response = self.send_tool_results(results).await?;
        Ok(single_response_stream(response).await)
    }
}

async fn single_response_stream(response: LlmResponse) -> StreamHandle {
    let (tx, rx) = mpsc::channel(2);
    let text = response.text_content();
    if !text.is_empty() {
        let _ = tx.send(StreamEvent::Delta(text)).await;
    }
    // The receiver may already be gone; nothing to do then.
    let _ = tx.send(StreamEvent::CompletedResponse(response)).await;
    StreamHandle::new(rx)
}
