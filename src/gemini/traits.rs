use crate::{
    error::Result,
    models::{Character, GenerationSettings},
};
use async_trait::async_trait;

/// A backend that turns one scene prompt into one image data URI.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Fails with a configuration error when the backend cannot make requests.
    fn ensure_configured(&self) -> Result<()>;

    async fn generate(
        &self,
        prompt: &str,
        characters: &[Character],
        settings: &GenerationSettings,
    ) -> Result<String>;
}
