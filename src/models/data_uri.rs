use base64::{engine::general_purpose, Engine as _};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoryboardError};

/// A `data:<mime>;base64,<payload>` string split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: String,
}

impl DataUri {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn png(data: impl Into<String>) -> Self {
        Self::new("image/png", data)
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, general_purpose::STANDARD.encode(bytes))
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| StoryboardError::SerializationError(format!("Invalid base64: {}", e)))
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}

impl FromStr for DataUri {
    type Err = StoryboardError;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix("data:")
            .ok_or_else(|| StoryboardError::SerializationError("Not a data URI".into()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| StoryboardError::SerializationError("Data URI has no payload".into()))?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            StoryboardError::SerializationError("Only base64 data URIs are supported".into())
        })?;

        Ok(DataUri::new(mime_type, data))
    }
}

/// Guess an image MIME type from a file extension.
pub fn mime_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}
