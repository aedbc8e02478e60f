//! reqwest-backed [`ProviderClient`]

use super::wire;
use crate::config::FileProviderConfig;
use crate::credentials::{ApiKeyCache, KeySource};
use async_trait::async_trait;
use atelier_application::ProviderClient;
use atelier_domain::{JobPoll, ProviderError, ProviderKey, ProviderKind, ProviderRequest, Submission};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub kind: ProviderKind,
    pub key: ProviderKey,
    pub base_url: String,
    pub model: Option<String>,
    pub submit_path: String,
    /// `{job_id}` is replaced with the provider job id.
    pub status_path: String,
    pub credentials: KeySource,
    pub request_timeout: Duration,
}

impl HttpProviderConfig {
    pub fn from_file(kind: ProviderKind, file: &FileProviderConfig) -> Self {
        Self {
            kind,
            key: file.key(),
            base_url: file.base_url.clone(),
            model: file.model.clone(),
            submit_path: file.submit_path.clone(),
            status_path: file.status_path.clone(),
            credentials: KeySource::from_config(file.api_key.as_deref(), file.api_key_env.as_deref()),
            request_timeout: Duration::from_millis(file.request_timeout_ms),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn submit_url(&self) -> String {
        self.url(&self.submit_path)
    }

    fn status_url(&self, job_id: &str) -> String {
        self.url(&self.status_path.replace("{job_id}", job_id))
    }
}

pub struct HttpProviderClient {
    client: reqwest::Client,
    config: HttpProviderConfig,
    keys: Arc<ApiKeyCache>,
}

impl HttpProviderClient {
    pub fn new(config: HttpProviderConfig, keys: Arc<ApiKeyCache>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::permanent(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config,
            keys,
        })
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ProviderError> {
        let key = self
            .config
            .credentials
            .resolve(&self.keys)
            .map_err(|e| ProviderError::permanent(format!("{}: {}", self.config.key, e)))?;
        Ok(match key {
            Some(key) => request.bearer_auth(key),
            None => request,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, ProviderError> {
        let response = self
            .authorize(request)?
            .send()
            .await
            .map_err(|e| ProviderError::transient(format!("{}: {}", self.config.key, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if matches!(status.as_u16(), 401 | 403) {
                self.config.credentials.invalidate(&self.keys);
            }
            let error = ProviderError::from_http_status(
                status.as_u16(),
                format!("{} returned {}: {}", self.config.key, status, body.trim()),
            );
            warn!(provider = %self.config.key, status = status.as_u16(), "{}", error.message);
            return Err(error);
        }

        response.json().await.map_err(|e| {
            ProviderError::permanent(format!("{}: unreadable response: {}", self.config.key, e))
        })
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    fn kind(&self) -> ProviderKind {
        self.config.kind
    }

    fn key(&self) -> &ProviderKey {
        &self.config.key
    }

    async fn submit(&self, request: &ProviderRequest) -> Result<Submission, ProviderError> {
        let body = wire::submit_body(request, self.config.model.as_deref());
        debug!(provider = %self.config.key, kind = %request.kind, "submitting job");
        let response = self
            .send(self.client.post(self.config.submit_url()).json(&body))
            .await?;
        wire::parse_submission(&response)
    }

    async fn poll(&self, job_id: &str) -> Result<JobPoll, ProviderError> {
        let response = self
            .send(self.client.get(self.config.status_url(job_id)))
            .await?;
        wire::parse_status(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::DEFAULT_KEY_TTL;

    fn file_config() -> FileProviderConfig {
        FileProviderConfig {
            name: "fal".to_string(),
            tier: "pro".to_string(),
            base_url: "http://127.0.0.1:9/v1/".to_string(),
            model: Some("flux-pro".to_string()),
            api_key: Some("secret".to_string()),
            status_path: "/requests/{job_id}/status".to_string(),
            request_timeout_ms: 2_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_from_file_and_urls() {
        let config = HttpProviderConfig::from_file(ProviderKind::Image, &file_config());
        assert_eq!(config.key, ProviderKey::new("fal", "pro"));
        assert_eq!(config.credentials, KeySource::Literal("secret".into()));
        assert_eq!(config.submit_url(), "http://127.0.0.1:9/v1/jobs");
        assert_eq!(
            config.status_url("req-1"),
            "http://127.0.0.1:9/v1/requests/req-1/status"
        );
        assert_eq!(config.request_timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transient() {
        let config = HttpProviderConfig::from_file(ProviderKind::Image, &file_config());
        let client =
            HttpProviderClient::new(config, Arc::new(ApiKeyCache::new(DEFAULT_KEY_TTL))).unwrap();
        assert_eq!(client.kind(), ProviderKind::Image);

        let err = client
            .submit(&ProviderRequest::new(ProviderKind::Image, "a lighthouse"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(err.message.starts_with("fal:pro"));
    }

    #[tokio::test]
    async fn test_missing_key_is_permanent() {
        let mut file = file_config();
        file.api_key = None;
        file.api_key_env = Some("ATELIER_TEST_PROVIDER_KEY_UNSET".to_string());
        let config = HttpProviderConfig::from_file(ProviderKind::Speech, &file);
        let client =
            HttpProviderClient::new(config, Arc::new(ApiKeyCache::new(DEFAULT_KEY_TTL))).unwrap();

        let err = client.poll("job-1").await.unwrap_err();
        assert!(!err.is_transient());
        assert!(err.message.contains("ATELIER_TEST_PROVIDER_KEY_UNSET"));
    }
}
