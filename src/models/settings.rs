use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoryboardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Ratio16x9,
    #[serde(rename = "9:16")]
    Ratio9x16,
    #[serde(rename = "1:1")]
    Ratio1x1,
    #[serde(rename = "4:3")]
    Ratio4x3,
    #[serde(rename = "Custom")]
    Custom,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Ratio16x9 => "16:9",
            AspectRatio::Ratio9x16 => "9:16",
            AspectRatio::Ratio1x1 => "1:1",
            AspectRatio::Ratio4x3 => "4:3",
            AspectRatio::Custom => "Custom",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = StoryboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16:9" => Ok(AspectRatio::Ratio16x9),
            "9:16" => Ok(AspectRatio::Ratio9x16),
            "1:1" => Ok(AspectRatio::Ratio1x1),
            "4:3" => Ok(AspectRatio::Ratio4x3),
            other if other.eq_ignore_ascii_case("custom") => Ok(AspectRatio::Custom),
            other => Err(StoryboardError::ValidationError(format!(
                "Unknown aspect ratio: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub aspect_ratio: AspectRatio,
    /// Only read when `aspect_ratio` is `Custom`.
    #[serde(default)]
    pub custom_aspect_ratio: Option<String>,
}

impl GenerationSettings {
    pub fn new(aspect_ratio: AspectRatio) -> Self {
        Self {
            aspect_ratio,
            custom_aspect_ratio: None,
        }
    }

    pub fn custom(text: impl Into<String>) -> Self {
        Self {
            aspect_ratio: AspectRatio::Custom,
            custom_aspect_ratio: Some(text.into()),
        }
    }

    /// The ratio string sent to the model, if any. Custom text is passed on
    /// as typed; only an empty string means "no ratio".
    pub fn resolved_ratio(&self) -> Option<&str> {
        match self.aspect_ratio {
            AspectRatio::Custom => self
                .custom_aspect_ratio
                .as_deref()
                .filter(|text| !text.is_empty()),
            fixed => Some(fixed.as_str()),
        }
    }
}
