pub mod image_client;
pub mod prompt;
pub mod traits;

use crate::config::GeminiConfig;
use reqwest::Client;

pub use image_client::ImageClient;
pub use prompt::build_request;
pub use traits::ImageGenerator;

#[derive(Clone)]
pub struct GeminiClient {
    image_client: ImageClient,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        if config.api_key.is_none() {
            log::warn!("No Gemini API key configured; generation requests will be rejected");
        }

        let client = Client::new();
        Self {
            image_client: ImageClient::new(client, config),
        }
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }
}
