use std::env;
use std::time::Duration;

pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash-image";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_DOWNLOAD_STAGGER_MS: u64 = 300;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model_id: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// `None` dispatches every slot of a batch at once.
    pub max_concurrency: Option<usize>,
    pub download_stagger_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub batch: BatchConfig,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            model_id: DEFAULT_MODEL_ID.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = env::var("API_KEY")
            .ok()
            .or_else(|| env::var("GEMINI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty());
        let model_id = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());
        let base_url =
            env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        GeminiConfig {
            api_key,
            model_id,
            base_url,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model_id
        )
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            max_concurrency: None,
            download_stagger_ms: DEFAULT_DOWNLOAD_STAGGER_MS,
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let max_concurrency = env::var("STORYBOARD_MAX_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|limit: &usize| *limit > 0);
        let download_stagger_ms = env::var("STORYBOARD_DOWNLOAD_STAGGER_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DOWNLOAD_STAGGER_MS);

        BatchConfig {
            max_concurrency,
            download_stagger_ms,
        }
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit.max(1));
        self
    }

    pub fn with_download_stagger_ms(mut self, millis: u64) -> Self {
        self.download_stagger_ms = millis;
        self
    }

    pub fn download_stagger(&self) -> Duration {
        Duration::from_millis(self.download_stagger_ms)
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Config {
            gemini: GeminiConfig::from_env(),
            batch: BatchConfig::from_env(),
        }
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self
    }

    pub fn with_batch(mut self, config: BatchConfig) -> Self {
        self.batch = config;
        self
    }
}
