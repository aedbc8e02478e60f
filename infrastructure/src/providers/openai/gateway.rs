//! Gateway: credential resolution and session creation.

use super::session::OpenAiSession;
use crate::config::FileReasoningConfig;
use crate::credentials::{ApiKeyCache, KeySource};
use async_trait::async_trait;
use atelier_application::{GatewayError, LlmGateway, LlmSession};
use atelier_domain::Model;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    /// Base URL up to and including the version segment (`.../v1`).
    pub base_url: String,
    pub key: KeySource,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

impl OpenAiCompatConfig {
    pub fn from_file(file: &FileReasoningConfig) -> Self {
        Self {
            base_url: file.base_url.clone(),
            key: KeySource::from_config(file.api_key.as_deref(), Some(file.api_key_env.as_str())),
            max_tokens: file.max_tokens,
            temperature: file.temperature,
            timeout: Duration::from_secs(file.timeout_seconds),
        }
    }

    pub(super) fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

pub struct OpenAiCompatGateway {
    client: reqwest::Client,
    config: Arc<OpenAiCompatConfig>,
    keys: Arc<ApiKeyCache>,
}

impl OpenAiCompatGateway {
    pub fn new(config: OpenAiCompatConfig, keys: Arc<ApiKeyCache>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::ConnectionError(format!("HTTP client: {}", e)))?;
        info!(base_url = %config.base_url, "Reasoning gateway initialized");
        Ok(Self {
            client,
            config: Arc::new(config),
            keys,
        })
    }
}

#[async_trait]
impl LlmGateway for OpenAiCompatGateway {
    async fn create_session(
        &self,
        model: &Model,
        system_prompt: &str,
    ) -> Result<Box<dyn LlmSession>, GatewayError> {
        let api_key = self
            .config
            .key
            .resolve(&self.keys)
            .map_err(|e| GatewayError::Unauthorized(e.to_string()))?;

        Ok(Box::new(OpenAiSession::new(
            self.client.clone(),
            self.config.clone(),
            self.keys.clone(),
            api_key,
            model.clone(),
            system_prompt,
        )))
    }
}
