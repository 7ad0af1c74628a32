//! JSON description of a storyboard run, used by the `storyboard` binary.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{
    error::{Result, StoryboardError},
    models::{AspectRatio, CHARACTER_SLOTS, MAX_PROMPTS},
    session::Session,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterEntry {
    pub name: String,
    /// Relative paths resolve against the manifest's directory.
    pub image: Option<PathBuf>,
    #[serde(default = "default_include")]
    pub include: bool,
}

fn default_include() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub characters: Vec<CharacterEntry>,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub custom_aspect_ratio: Option<String>,
    pub prompts: Vec<String>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Manifest {
    pub fn from_json(json: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut manifest: Manifest = serde_json::from_str(json)?;
        manifest.base_dir = base_dir.into();
        manifest.validate()?;
        Ok(manifest)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::from_json(&json, base_dir)
    }

    fn validate(&self) -> Result<()> {
        if self.characters.len() > CHARACTER_SLOTS {
            return Err(StoryboardError::ValidationError(format!(
                "At most {} characters are supported, got {}",
                CHARACTER_SLOTS,
                self.characters.len()
            )));
        }
        if self.prompts.len() > MAX_PROMPTS {
            return Err(StoryboardError::PromptLimit(MAX_PROMPTS));
        }
        Ok(())
    }

    /// Load images and prompts into the session, slot by slot.
    pub async fn apply(&self, session: &mut Session) -> Result<()> {
        for (index, entry) in self.characters.iter().enumerate() {
            let id = format!("char-{}", index + 1);
            session.rename_character(&id, entry.name.clone())?;
            if let Some(image) = &entry.image {
                session
                    .load_character_image(&id, self.base_dir.join(image))
                    .await?;
                session.set_character_included(&id, entry.include)?;
            }
        }

        session.set_aspect_ratio(self.aspect_ratio);
        if let Some(text) = &self.custom_aspect_ratio {
            session.set_custom_aspect_ratio(text.clone());
        }

        let mut prompts = self.prompts.iter();
        if let Some(first) = prompts.next() {
            let first_id = session.prompts()[0].id.clone();
            session.update_prompt(&first_id, first.clone())?;
        }
        for text in prompts {
            session.add_prompt(text.clone())?;
        }
        Ok(())
    }
}
