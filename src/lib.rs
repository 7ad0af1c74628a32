pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod gemini;
pub mod logger;
pub mod manifest;
pub mod models;
pub mod session;

pub use batch::{BatchOrchestrator, BatchRun};
pub use config::{BatchConfig, Config, GeminiConfig};
pub use error::{Result, StoryboardError};
pub use gemini::{GeminiClient, ImageClient, ImageGenerator};
pub use models::{
    AspectRatio, Character, CharacterImage, CharacterRegistry, GenerationSettings, PromptItem,
    PromptList, ResultSlot, SlotStatus,
};
pub use session::Session;
