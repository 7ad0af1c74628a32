use crate::{
    config::GeminiConfig,
    error::{Result, StoryboardError},
    gemini::{prompt::build_request, traits::ImageGenerator},
    logger,
    models::{Character, DataUri, GenerateContentResponse, GenerationSettings},
};
use async_trait::async_trait;
use reqwest::Client;

#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    config: GeminiConfig,
}

impl ImageClient {
    pub fn new(client: Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                StoryboardError::ConfigError(
                    "API key is missing. Set API_KEY or GEMINI_API_KEY in the environment".into(),
                )
            })
    }

    /// One request, one image. No retries happen here.
    pub async fn generate(
        &self,
        prompt: &str,
        characters: &[Character],
        settings: &GenerationSettings,
    ) -> Result<String> {
        let api_key = self.api_key()?;
        let request = build_request(prompt, characters, settings);

        log::info!(
            "Generating image with model: {} ({} reference images)",
            self.config.model_id,
            request.attachments().count()
        );
        log::debug!("Scene prompt: {}", prompt);
        let _timer = logger::timer("gemini generateContent");

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                log::error!("Gemini request failed: {:?}", e);
                StoryboardError::UpstreamError(format!("Gemini request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::error!("Gemini returned HTTP {}: {}", status, error_text);
            return Err(StoryboardError::UpstreamError(format!(
                "Gemini returned HTTP {}: {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            StoryboardError::UpstreamError(format!("Gemini response could not be decoded: {}", e))
        })?;

        image_from_response(&body)
    }
}

/// Wrap the response's image payload as a PNG data URI.
pub fn image_from_response(response: &GenerateContentResponse) -> Result<String> {
    match response.first_image() {
        Some(data) => Ok(DataUri::png(data).to_string()),
        None => {
            log::warn!("Gemini response contained no image data");
            Err(StoryboardError::EmptyResponse)
        }
    }
}

#[async_trait]
impl ImageGenerator for ImageClient {
    fn ensure_configured(&self) -> Result<()> {
        self.api_key().map(|_| ())
    }

    async fn generate(
        &self,
        prompt: &str,
        characters: &[Character],
        settings: &GenerationSettings,
    ) -> Result<String> {
        ImageClient::generate(self, prompt, characters, settings).await
    }
}
