//! Global plan settings: aspect ratio, transitions and palette.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output aspect ratio requested from image and video providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Classic,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Square => "1:1",
            AspectRatio::Classic => "4:3",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "16:9" | "landscape" | "wide" => Ok(AspectRatio::Landscape),
            "9:16" | "portrait" | "vertical" => Ok(AspectRatio::Portrait),
            "1:1" | "square" => Ok(AspectRatio::Square),
            "4:3" | "classic" => Ok(AspectRatio::Classic),
            _ => Err(DomainError::InvalidValue {
                field: "aspect_ratio",
                value: s.to_string(),
            }),
        }
    }
}

/// How consecutive units are joined in the assembled artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStyle {
    Cut,
    #[default]
    Fade,
    Dissolve,
    Slide,
    Zoom,
}

impl TransitionStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionStyle::Cut => "cut",
            TransitionStyle::Fade => "fade",
            TransitionStyle::Dissolve => "dissolve",
            TransitionStyle::Slide => "slide",
            TransitionStyle::Zoom => "zoom",
        }
    }
}

impl fmt::Display for TransitionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionStyle {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cut" | "none" => Ok(TransitionStyle::Cut),
            "fade" | "crossfade" => Ok(TransitionStyle::Fade),
            "dissolve" => Ok(TransitionStyle::Dissolve),
            "slide" | "wipe" => Ok(TransitionStyle::Slide),
            "zoom" => Ok(TransitionStyle::Zoom),
            _ => Err(DomainError::InvalidValue {
                field: "transition",
                value: s.to_string(),
            }),
        }
    }
}

/// Settings that apply to every unit of a plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub aspect_ratio: AspectRatio,
    pub transition: TransitionStyle,
    /// Hex colors (`#RRGGBB`), in order of prominence.
    #[serde(default)]
    pub color_palette: Vec<String>,
}

impl GlobalSettings {
    /// Keep only well-formed `#RRGGBB` palette entries, normalized to upper case.
    pub fn normalized_palette(colors: &[String]) -> Vec<String> {
        colors
            .iter()
            .map(|c| c.trim())
            .filter(|c| c.len() == 7 && c.starts_with('#'))
            .filter(|c| c[1..].chars().all(|ch| ch.is_ascii_hexdigit()))
            .map(|c| c.to_uppercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_aliases() {
        assert_eq!("portrait".parse::<AspectRatio>().unwrap(), AspectRatio::Portrait);
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Landscape);
        assert!("3:2".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_aspect_ratio_serde_uses_ratio_string() {
        let json = serde_json::to_string(&AspectRatio::Square).unwrap();
        assert_eq!(json, "\"1:1\"");
    }

    #[test]
    fn test_transition_aliases() {
        assert_eq!("crossfade".parse::<TransitionStyle>().unwrap(), TransitionStyle::Fade);
        assert_eq!("none".parse::<TransitionStyle>().unwrap(), TransitionStyle::Cut);
    }

    #[test]
    fn test_palette_normalization_drops_invalid_entries() {
        let palette = GlobalSettings::normalized_palette(&[
            "#ff0000".to_string(),
            "blue".to_string(),
            " #00ff00 ".to_string(),
            "#12345G".to_string(),
        ]);
        assert_eq!(palette, vec!["#FF0000", "#00FF00"]);
    }
}
