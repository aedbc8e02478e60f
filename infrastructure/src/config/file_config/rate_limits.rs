//! Rate-limit configuration from TOML (`[rate_limits]` section)
//!
//! ```toml
//! [rate_limits.default]
//! max_concurrent = 2
//! min_interval_ms = 500
//!
//! [rate_limits."fal:pro"]
//! max_concurrent = 4
//! min_interval_ms = 250
//! ```

use super::ConfigValidationError;
use atelier_application::RateLimitPolicy;
use atelier_domain::ProviderKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Table name holding the fallback policy.
pub const DEFAULT_RATE_LIMIT_KEY: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRateLimit {
    pub max_concurrent: usize,
    #[serde(default)]
    pub min_interval_ms: u64,
}

impl FileRateLimit {
    fn to_policy(self, key: &str) -> Result<RateLimitPolicy, ConfigValidationError> {
        RateLimitPolicy::new(self.max_concurrent, Duration::from_millis(self.min_interval_ms))
            .map_err(|_| ConfigValidationError::ZeroConcurrency(key.to_string()))
    }
}

/// `provider:tier` (or `default`) to policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRateLimitsConfig(pub BTreeMap<String, FileRateLimit>);

impl FileRateLimitsConfig {
    /// Fallback policy plus per-key overrides.
    pub fn to_policies(
        &self,
    ) -> Result<(RateLimitPolicy, HashMap<ProviderKey, RateLimitPolicy>), ConfigValidationError>
    {
        let default = match self.0.get(DEFAULT_RATE_LIMIT_KEY) {
            Some(limit) => limit.to_policy(DEFAULT_RATE_LIMIT_KEY)?,
            None => RateLimitPolicy::default(),
        };

        let mut policies = HashMap::new();
        for (name, limit) in &self.0 {
            if name == DEFAULT_RATE_LIMIT_KEY {
                continue;
            }
            let key: ProviderKey = name
                .parse()
                .map_err(|_| ConfigValidationError::InvalidRateLimitKey(name.clone()))?;
            policies.insert(key, limit.to_policy(name)?);
        }
        Ok((default, policies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> FileRateLimitsConfig {
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        config.rate_limits
    }

    #[test]
    fn test_default_and_keyed_policies() {
        let limits = parse(
            r#"
[rate_limits.default]
max_concurrent = 3
min_interval_ms = 100

[rate_limits."fal:pro"]
max_concurrent = 8
"#,
        );
        let (default, keyed) = limits.to_policies().unwrap();
        assert_eq!(default.max_concurrent(), 3);
        assert_eq!(default.min_interval(), Duration::from_millis(100));

        let pro = keyed[&ProviderKey::new("fal", "pro")];
        assert_eq!(pro.max_concurrent(), 8);
        assert_eq!(pro.min_interval(), Duration::ZERO);
    }

    #[test]
    fn test_missing_default_uses_builtin() {
        let (default, keyed) = FileRateLimitsConfig::default().to_policies().unwrap();
        assert_eq!(default, RateLimitPolicy::default());
        assert!(keyed.is_empty());
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let limits = parse(
            r#"
[rate_limits."replicate"]
max_concurrent = 0
"#,
        );
        assert!(matches!(
            limits.to_policies(),
            Err(ConfigValidationError::ZeroConcurrency(key)) if key == "replicate"
        ));
    }
}
