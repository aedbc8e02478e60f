//! Provider value objects shared by the provider port and its adapters.
//!
//! Every external creative-AI provider is reduced to the same contract:
//! `submit` returns either a synchronous [`Submission::Completed`] result or
//! a [`Submission::Queued`] job id, and `poll` returns a [`JobPoll`]
//! snapshot. Provider-specific fields never cross this boundary.

use crate::core::error::DomainError;
use crate::plan::settings::AspectRatio;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What a provider produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Image,
    Video,
    Speech,
    Search,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Image => "image",
            ProviderKind::Video => "video",
            ProviderKind::Speech => "speech",
            ProviderKind::Search => "search",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate-limit key: one provider at one capacity tier (`provider:tier`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderKey {
    pub provider: String,
    pub tier: String,
}

impl ProviderKey {
    pub fn new(provider: impl Into<String>, tier: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            tier: tier.into(),
        }
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.tier)
    }
}

impl FromStr for ProviderKey {
    type Err = DomainError;

    /// Parses `provider:tier`; a bare `provider` gets the `default` tier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, tier) = match s.split_once(':') {
            Some((p, t)) => (p.trim(), t.trim()),
            None => (s.trim(), "default"),
        };
        if provider.is_empty() || tier.is_empty() {
            return Err(DomainError::InvalidValue {
                field: "provider_key",
                value: s.to_string(),
            });
        }
        Ok(Self::new(provider, tier))
    }
}

/// A provider-agnostic generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub kind: ProviderKind,
    pub prompt: String,
    /// Upstream asset for transforms (image -> video).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    /// Free-form extra parameters forwarded to the adapter.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl ProviderRequest {
    pub fn new(kind: ProviderKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            input_url: None,
            aspect_ratio: None,
            params: serde_json::Map::new(),
        }
    }

    pub fn with_input_url(mut self, url: impl Into<String>) -> Self {
        self.input_url = Some(url.into());
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = Some(aspect_ratio);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// Outcome of a provider submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Submission {
    /// The provider answered synchronously.
    Completed { result_url: String },
    /// The provider accepted an asynchronous job.
    Queued { job_id: String },
}

/// Provider-side job status as reported by `poll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RemoteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteStatus::Completed | RemoteStatus::Failed)
    }
}

/// One status snapshot from `poll`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPoll {
    pub status: RemoteStatus,
    /// 0-100.
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobPoll {
    pub fn pending() -> Self {
        Self {
            status: RemoteStatus::Pending,
            progress: 0,
            result_url: None,
            error: None,
        }
    }

    pub fn processing(progress: u8) -> Self {
        Self {
            status: RemoteStatus::Processing,
            progress: progress.min(100),
            result_url: None,
            error: None,
        }
    }

    pub fn completed(result_url: impl Into<String>) -> Self {
        Self {
            status: RemoteStatus::Completed,
            progress: 100,
            result_url: Some(result_url.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: RemoteStatus::Failed,
            progress: 0,
            result_url: None,
            error: Some(error.into()),
        }
    }
}

/// Retry classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderErrorKind {
    /// Network failure, timeout, 5xx, 429: the caller may retry.
    Transient,
    /// Invalid input, auth failure, other 4xx: retrying unchanged is pointless.
    Permanent,
}

/// Error returned by a provider client.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind:?} provider error: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Permanent,
            message: message.into(),
        }
    }

    /// Classify an HTTP status code.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            408 | 425 | 429 | 500..=599 => Self::transient(format!("HTTP {}: {}", status, message)),
            _ => Self::permanent(format!("HTTP {}: {}", status, message)),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ProviderErrorKind::Transient
    }
}
