use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoryboardError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Please enter at least one prompt")]
    NoPrompts,
    #[error("No image data found in response")]
    EmptyResponse,
    #[error("Upstream error: {0}")]
    UpstreamError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Prompt limit reached: at most {0} prompts are allowed")]
    PromptLimit(usize),
    #[error("Result slot not found: {0}")]
    SlotNotFound(String),
    #[error("Result slot is still generating: {0}")]
    SlotBusy(String),
    #[error("Result slot has no image to export: {0}")]
    SlotNotReady(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StoryboardError {
    /// Errors raised before any slot exists; these block the whole action.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            StoryboardError::ConfigError(_) | StoryboardError::NoPrompts
        )
    }
}

impl From<serde_json::Error> for StoryboardError {
    fn from(e: serde_json::Error) -> Self {
        StoryboardError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoryboardError>;
