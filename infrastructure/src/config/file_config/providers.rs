//! Provider configuration from TOML (`[providers.*]` and `[search]` sections)

use atelier_application::PollPolicy;
use atelier_domain::{ProviderKey, ProviderKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One generation provider reachable over the generic job REST shape.
///
/// ```toml
/// [providers.image]
/// name = "fal"
/// tier = "pro"
/// base_url = "https://queue.example.com/v1"
/// model = "flux-pro"
/// api_key_env = "FAL_KEY"
/// poll_interval_ms = 3000
/// timeout_ms = 300000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Provider id, first half of the rate-limit key
    pub name: String,
    /// Capacity tier, second half of the rate-limit key
    pub tier: String,
    pub base_url: String,
    /// Model or endpoint id forwarded with every submission
    pub model: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Direct API key (prefer `api_key_env`)
    pub api_key: Option<String>,
    /// Path for submissions, relative to `base_url`
    pub submit_path: String,
    /// Path for status checks; `{job_id}` is substituted
    pub status_path: String,
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
    /// Timeout of a single HTTP request
    pub request_timeout_ms: u64,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            tier: "default".to_string(),
            base_url: String::new(),
            model: None,
            api_key_env: None,
            api_key: None,
            submit_path: "/jobs".to_string(),
            status_path: "/jobs/{job_id}".to_string(),
            poll_interval_ms: 5_000,
            timeout_ms: 600_000,
            request_timeout_ms: 60_000,
        }
    }
}

impl FileProviderConfig {
    pub fn key(&self) -> ProviderKey {
        ProviderKey::new(self.name.trim(), self.tier.trim())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.timeout_ms),
        )
    }
}

/// `[providers]`: one optional entry per asset kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvidersConfig {
    pub image: Option<FileProviderConfig>,
    pub video: Option<FileProviderConfig>,
    pub speech: Option<FileProviderConfig>,
}

impl FileProvidersConfig {
    /// Configured providers with the kind they serve.
    pub fn iter(&self) -> impl Iterator<Item = (ProviderKind, &FileProviderConfig)> {
        [
            (ProviderKind::Image, self.image.as_ref()),
            (ProviderKind::Video, self.video.as_ref()),
            (ProviderKind::Speech, self.speech.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, config)| config.map(|c| (kind, c)))
    }
}

/// `[search]`: DuckDuckGo Instant Answer endpoint for `web_search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSearchConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for FileSearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.duckduckgo.com/".to_string(),
            timeout_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_key_and_poll_policy() {
        let config = FileProviderConfig {
            name: "fal".to_string(),
            tier: "pro".to_string(),
            poll_interval_ms: 2_000,
            timeout_ms: 90_000,
            ..Default::default()
        };
        assert_eq!(config.key().to_string(), "fal:pro");
        let policy = config.poll_policy();
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_iter_skips_unconfigured_kinds() {
        let providers = FileProvidersConfig {
            image: Some(FileProviderConfig::default()),
            speech: Some(FileProviderConfig::default()),
            ..Default::default()
        };
        let kinds: Vec<ProviderKind> = providers.iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![ProviderKind::Image, ProviderKind::Speech]);
    }
}
