//! Model value object identifying the reasoning model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a reasoning model (e.g. `gpt-4.1`, `claude-sonnet-4.5`).
///
/// The planner only forwards this name to the gateway; it never branches on
/// specific model families.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Model(String);

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new("gpt-4.1")
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Model {
    type Err = crate::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(crate::DomainError::InvalidValue {
                field: "model",
                value: s.to_string(),
            });
        }
        Ok(Self::new(trimmed))
    }
}
