//! Generation request submitted by the external caller.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of one generation run (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RunId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = uuid::Uuid::parse_str(s.trim()).map_err(|_| DomainError::InvalidValue {
            field: "run_id",
            value: s.to_string(),
        })?;
        Ok(Self(parsed.to_string()))
    }
}

/// Reference material supplied with a request (an image, a document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceAsset {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ReferenceAsset {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then_some(description);
        self
    }
}

/// Parses `"<url> [description]"`: the URL ends at the first whitespace.
impl FromStr for ReferenceAsset {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (url, description) = match s.split_once(char::is_whitespace) {
            Some((url, rest)) => (url, rest.trim()),
            None => (s, ""),
        };
        let asset = ReferenceAsset::new(url).with_description(description);
        asset.validate()?;
        Ok(asset)
    }
}

impl ReferenceAsset {
    fn validate(&self) -> Result<(), DomainError> {
        const SCHEMES: [&str; 4] = ["http://", "https://", "file://", "data:"];
        if SCHEMES.iter().any(|scheme| self.url.starts_with(scheme)) {
            Ok(())
        } else {
            Err(DomainError::InvalidValue {
                field: "reference_assets.url",
                value: self.url.clone(),
            })
        }
    }
}

/// `{goal, referenceAssets?, style?}` as received at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub goal: String,
    #[serde(default, alias = "referenceAssets")]
    pub reference_assets: Vec<ReferenceAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl GenerationRequest {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            reference_assets: Vec::new(),
            style: None,
        }
    }

    pub fn with_reference(mut self, asset: ReferenceAsset) -> Self {
        self.reference_assets.push(asset);
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.goal.trim().is_empty() {
            return Err(DomainError::InvalidRequest("goal must not be empty".into()));
        }
        for asset in &self.reference_assets {
            asset.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_parse_with_description() {
        let asset: ReferenceAsset = "https://x.test/a.png?w=200  a misty harbour".parse().unwrap();
        assert_eq!(asset.url, "https://x.test/a.png?w=200");
        assert_eq!(asset.description.as_deref(), Some("a misty harbour"));

        let bare: ReferenceAsset = "file:///tmp/ref.jpg".parse().unwrap();
        assert_eq!(bare.description, None);
    }

    #[test]
    fn test_reference_rejects_unknown_scheme() {
        assert!("ftp://host/a.png".parse::<ReferenceAsset>().is_err());
    }

    #[test]
    fn test_request_validation() {
        assert!(GenerationRequest::new("  ").validate().is_err());
        let request = GenerationRequest::new("A film about tides")
            .with_reference(ReferenceAsset::new("https://x.test/tide.jpg"));
        assert!(request.validate().is_ok());

        let bad = GenerationRequest::new("x").with_reference(ReferenceAsset::new("tide.jpg"));
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_request_accepts_camel_case_references() {
        let request: GenerationRequest = serde_json::from_value(serde_json::json!({
            "goal": "g",
            "referenceAssets": [{"url": "https://x.test/a.png", "description": "d"}]
        }))
        .unwrap();
        assert_eq!(request.reference_assets.len(), 1);
    }

    #[test]
    fn test_run_id_round_trips_through_str() {
        let id = RunId::generate();
        let parsed: RunId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<RunId>().is_err());
    }
}
