//! API key resolution and caching.
//!
//! Keys come from a literal in the config file or from an environment
//! variable. Resolved values are cached in an [`ApiKeyCache`] owned by the
//! dependency-injection root and shared by every adapter through `Arc`.

mod cache;

pub use cache::{ApiKeyCache, Clock, DEFAULT_KEY_TTL, SystemClock};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("environment variable {0} is not set")]
    MissingEnv(String),
}

/// Where an adapter's API key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Literal(String),
    Env(String),
    /// Unauthenticated endpoint (local servers).
    None,
}

impl KeySource {
    /// A literal key wins over the environment variable.
    pub fn from_config(literal: Option<&str>, env: Option<&str>) -> Self {
        match (
            literal.filter(|k| !k.trim().is_empty()),
            env.filter(|e| !e.trim().is_empty()),
        ) {
            (Some(key), _) => KeySource::Literal(key.to_string()),
            (None, Some(var)) => KeySource::Env(var.to_string()),
            (None, None) => KeySource::None,
        }
    }

    /// Resolve through `cache`. Environment lookups are cached under the
    /// variable name; literal keys bypass the cache.
    pub fn resolve(&self, cache: &ApiKeyCache) -> Result<Option<String>, CredentialError> {
        match self {
            KeySource::Literal(key) => Ok(Some(key.clone())),
            KeySource::Env(var) => cache
                .get_or_load(var, || {
                    std::env::var(var)
                        .ok()
                        .filter(|v| !v.trim().is_empty())
                        .ok_or_else(|| CredentialError::MissingEnv(var.clone()))
                })
                .map(Some),
            KeySource::None => Ok(None),
        }
    }

    /// Drop the cached value after the remote side rejected it.
    pub fn invalidate(&self, cache: &ApiKeyCache) {
        if let KeySource::Env(var) = self {
            cache.invalidate(var);
        }
    }
}
