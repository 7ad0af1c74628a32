use crate::{
    batch::{BatchOrchestrator, BatchRun},
    config::Config,
    error::{Result, StoryboardError},
    export,
    gemini::{GeminiClient, ImageGenerator},
    models::{
        AspectRatio, CharacterImage, CharacterRegistry, GenerationSettings, PromptItem,
        PromptList, ResultSlot,
    },
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

/// Everything one user works on: characters, settings, prompts and results.
pub struct Session {
    characters: CharacterRegistry,
    settings: GenerationSettings,
    prompts: PromptList,
    batch: BatchOrchestrator,
    config: Config,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let generator: Arc<dyn ImageGenerator> =
            Arc::new(GeminiClient::new(config.gemini.clone()).image().clone());
        Self::with_generator(generator, config)
    }

    pub fn with_generator(generator: Arc<dyn ImageGenerator>, config: Config) -> Self {
        Self {
            characters: CharacterRegistry::new(),
            settings: GenerationSettings::default(),
            prompts: PromptList::new(),
            batch: BatchOrchestrator::new(generator, config.batch.clone()),
            config,
        }
    }

    pub fn characters(&self) -> &CharacterRegistry {
        &self.characters
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn prompts(&self) -> &[PromptItem] {
        self.prompts.items()
    }

    pub fn set_character_image(&mut self, id: &str, image: CharacterImage) -> Result<()> {
        self.characters.set_image(id, image)
    }

    pub async fn load_character_image(&mut self, id: &str, path: impl AsRef<Path>) -> Result<()> {
        let image = CharacterImage::from_path(path).await?;
        self.characters.set_image(id, image)
    }

    pub fn clear_character_image(&mut self, id: &str) -> Result<()> {
        self.characters.clear_image(id)
    }

    pub fn rename_character(&mut self, id: &str, name: impl Into<String>) -> Result<()> {
        self.characters.rename(id, name)
    }

    pub fn toggle_character(&mut self, id: &str) -> Result<bool> {
        self.characters.toggle(id)
    }

    pub fn set_character_included(&mut self, id: &str, included: bool) -> Result<()> {
        self.characters.set_included(id, included)
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.settings.aspect_ratio = aspect_ratio;
    }

    pub fn set_custom_aspect_ratio(&mut self, text: impl Into<String>) {
        self.settings.custom_aspect_ratio = Some(text.into());
    }

    pub fn add_prompt(&mut self, text: impl Into<String>) -> Result<String> {
        self.prompts.add(text).map(|item| item.id.clone())
    }

    pub fn remove_prompt(&mut self, id: &str) -> bool {
        self.prompts.remove(id)
    }

    pub fn update_prompt(&mut self, id: &str, text: impl Into<String>) -> Result<()> {
        self.prompts.update(id, text)
    }

    /// Create the slots for a new batch and return the run that fills them.
    ///
    /// The run borrows nothing from the session: spawn it, and characters,
    /// settings and prompts stay editable while failed slots are retried.
    pub fn start_batch(&self) -> Result<BatchRun> {
        self.batch
            .begin_batch(self.prompts.items(), self.characters.all(), &self.settings)
    }

    /// Run every non-blank prompt as a new batch and wait for all of it.
    pub async fn generate_all(&self) -> Result<Vec<ResultSlot>> {
        Ok(self.start_batch()?.run().await)
    }

    /// Regenerate one slot with the characters and settings as they are now.
    pub async fn retry(&self, slot_id: &str) -> Result<ResultSlot> {
        self.batch
            .retry_one(slot_id, self.characters.all(), &self.settings)
            .await
    }

    pub fn results(&self) -> Vec<ResultSlot> {
        self.batch.slots()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ResultSlot>> {
        self.batch.subscribe()
    }

    pub fn completed_count(&self) -> usize {
        self.batch.completed_count()
    }

    pub fn preview(&self, slot_id: &str) -> Option<ResultSlot> {
        self.batch.get(slot_id)
    }

    pub async fn save_result(&self, slot_id: &str, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let slot = self
            .batch
            .get(slot_id)
            .ok_or_else(|| StoryboardError::SlotNotFound(slot_id.to_string()))?;
        export::save_slot(&slot, dir).await
    }

    pub async fn save_all(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let slots = self.batch.slots();
        export::save_all(&slots, dir, self.config.batch.download_stagger()).await
    }
}
