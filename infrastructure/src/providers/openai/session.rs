//! Chat completions session
//!
//! The endpoint is stateless, so the session keeps the full message history
//! and replays it on every request. Streamed turns are appended to history
//! by the reader task once the stream ends.

use super::gateway::OpenAiCompatConfig;
use super::stream::{SseData, SseDecoder, chunk_events};
use super::types;
use crate::credentials::ApiKeyCache;
use async_trait::async_trait;
use atelier_application::{GatewayError, LlmSession, StreamHandle, ToolResultMessage};
use atelier_domain::{LlmResponse, Model, StreamAccumulator, StreamEvent};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

const STREAM_BUFFER: usize = 64;

pub struct OpenAiSession {
    client: reqwest::Client,
    config: Arc<OpenAiCompatConfig>,
    keys: Arc<ApiKeyCache>,
    api_key: Option<String>,
    model: Model,
    /// Conversation history, system prompt first
    messages: Arc<Mutex<Vec<Value>>>,
    /// Tool definitions from the most recent `send_with_tools`
    tools: Mutex<Vec<Value>>,
}

impl OpenAiSession {
    pub fn new(
        client: reqwest::Client,
        config: Arc<OpenAiCompatConfig>,
        keys: Arc<ApiKeyCache>,
        api_key: Option<String>,
        model: Model,
        system_prompt: &str,
    ) -> Self {
        let mut messages = Vec::new();
        if !system_prompt.is_empty() {
            messages.push(types::system_message(system_prompt));
        }
        Self {
            client,
            config,
            keys,
            api_key,
            model,
            messages: Arc::new(Mutex::new(messages)),
            tools: Mutex::new(Vec::new()),
        }
    }

    async fn post(&self, messages: &[Value], stream: bool) -> Result<reqwest::Response, GatewayError> {
        let tools = self.tools.lock().await.clone();
        let body = types::request_body(
            self.model.as_str(),
            messages,
            &tools,
            self.config.max_tokens,
            self.config.temperature,
            stream,
        );

        debug!(
            model = %self.model,
            messages = messages.len(),
            stream,
            "Calling chat completions"
        );

        let mut request = self.client.post(self.config.completions_url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| types::convert_transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let error = types::convert_http_error(status.as_u16(), &text);
        if matches!(error, GatewayError::Unauthorized(_)) {
            self.config.key.invalidate(&self.keys);
        }
        warn!(status = status.as_u16(), "Chat completions request failed: {}", error);
        Err(error)
    }

    /// Append `new_messages`, run a blocking completion, record the reply.
    async fn complete(&self, new_messages: Vec<Value>) -> Result<LlmResponse, GatewayError> {
        let mut messages = self.messages.lock().await;
        messages.extend(new_messages);

        let response = self.post(&messages, false).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::RequestFailed(format!("Unreadable completion: {}", e)))?;
        let parsed = types::parse_completion(&body)?;

        messages.push(types::assistant_message(&parsed));
        Ok(parsed)
    }

    /// Append `new_messages` and start a streamed completion.
    async fn stream(&self, new_messages: Vec<Value>) -> Result<StreamHandle, GatewayError> {
        let snapshot = {
            let mut messages = self.messages.lock().await;
            messages.extend(new_messages);
            messages.clone()
        };

        let response = self.post(&snapshot, true).await?;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let history = self.messages.clone();
        tokio::spawn(read_stream(response, tx, history));
        Ok(StreamHandle::new(rx))
    }
}

/// Forward SSE chunks as [`StreamEvent`]s, finishing with the assembled
/// response. The assistant turn is recorded even if the receiver is gone.
async fn read_stream(
    response: reqwest::Response,
    tx: mpsc::Sender<StreamEvent>,
    history: Arc<Mutex<Vec<Value>>>,
) {
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::default();
    let mut acc = StreamAccumulator::new();
    let mut done = false;

    while !done {
        let payloads = match body.next().await {
            Some(Ok(bytes)) => decoder.push(&bytes),
            Some(Err(e)) => {
                let _ = tx.send(StreamEvent::Error(format!("Stream error: {}", e))).await;
                return;
            }
            None => {
                done = true;
                decoder.finish()
            }
        };

        for payload in payloads {
            match payload {
                SseData::Done => done = true,
                SseData::Chunk(chunk) => {
                    for event in chunk_events(&chunk, &mut acc) {
                        let failed = matches!(event, StreamEvent::Error(_));
                        let _ = tx.send(event).await;
                        if failed {
                            return;
                        }
                    }
                }
            }
        }
    }

    let response = acc.finish();
    history.lock().await.push(types::assistant_message(&response));
    let _ = tx.send(StreamEvent::CompletedResponse(response)).await;
}

#[async_trait]
impl LlmSession for OpenAiSession {
    fn model(&self) -> &Model {
        &self.model
    }

    async fn send_with_tools(
        &self,
        content: &str,
        tools: &[Value],
    ) -> Result<LlmResponse, GatewayError> {
        *self.tools.lock().await = tools.to_vec();
        self.complete(vec![types::user_message(content)]).await
    }

    async fn send_tool_results(
        &self,
        results: &[ToolResultMessage],
    ) -> Result<LlmResponse, GatewayError> {
        self.complete(results.iter().map(types::tool_result_message).collect())
            .await
    }

    async fn send_with_tools_streaming(
        &self,
        content: &str,
        tools: &[Value],
    ) -> Result<StreamHandle, GatewayError> {
        *self.tools.lock().await = tools.to_vec();
        self.stream(vec![types::user_message(content)]).await
    }

    async fn send_tool_results_streaming(
        &self,
        results: &[ToolResultMessage],
    ) -> Result<StreamHandle, GatewayError> {
        self.stream(results.iter().map(types::tool_result_message).collect())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{DEFAULT_KEY_TTL, KeySource};
    use std::time::Duration;

    fn session(system_prompt: &str) -> OpenAiSession {
        let config = OpenAiCompatConfig {
            // Reserved port: every request fails to connect.
            base_url: "http://127.0.0.1:9/v1".to_string(),
            key: KeySource::None,
            max_tokens: 256,
            temperature: None,
            timeout: Duration::from_secs(2),
        };
        OpenAiSession::new(
            reqwest::Client::new(),
            Arc::new(config),
            Arc::new(ApiKeyCache::new(DEFAULT_KEY_TTL)),
            None,
            Model::new("test-model"),
            system_prompt,
        )
    }

    #[tokio::test]
    async fn test_history_starts_with_system_prompt() {
        let session = session("You are a planner.");
        let messages = session.messages.lock().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "system");
    }

    #[tokio::test]
    async fn test_failed_request_keeps_user_turn_and_reports_error() {
        let session = session("");
        let tools = vec![serde_json::json!({"type": "function", "function": {"name": "web_search"}})];
        let result = session.send_with_tools_streaming("Plan tides", &tools).await;
        assert!(matches!(
            result,
            Err(GatewayError::ConnectionError(_))
                | Err(GatewayError::RequestFailed(_))
                | Err(GatewayError::Timeout)
        ));
        let messages = session.messages.lock().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["content"], "Plan tides");
        assert_eq!(session.tools.lock().await.len(), 1);
    }
}
