use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, StoryboardError};
use crate::models::data_uri::{mime_type_for_extension, DataUri};

pub const CHARACTER_SLOTS: usize = 4;

/// An uploaded reference image, kept as raw base64 without the data URI prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterImage {
    pub data: String,
    pub mime_type: String,
}

impl CharacterImage {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        let uri = DataUri::from_bytes(mime_type, bytes);
        Self {
            data: uri.data,
            mime_type: uri.mime_type,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(mime_type_for_extension)
            .ok_or_else(|| {
                StoryboardError::ValidationError(format!(
                    "Unsupported image file: {}",
                    path.display()
                ))
            })?;

        let bytes = tokio::fs::read(path).await?;
        log::debug!(
            "Read reference image {} ({} bytes, {})",
            path.display(),
            bytes.len(),
            mime_type
        );

        Ok(Self::from_bytes(&bytes, mime_type))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub image: Option<CharacterImage>,
    pub included: bool,
}

impl Character {
    pub fn empty(index: usize) -> Self {
        Self {
            id: format!("char-{}", index + 1),
            name: format!("Character {}", index + 1),
            image: None,
            included: false,
        }
    }

    /// Carries an image with actual data; only such characters can be included.
    pub fn has_image(&self) -> bool {
        self.image
            .as_ref()
            .map_or(false, |image| !image.data.is_empty())
    }

    pub fn is_active(&self) -> bool {
        self.included && self.has_image()
    }
}

/// The fixed set of character slots for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterRegistry {
    characters: Vec<Character>,
}

impl Default for CharacterRegistry {
    fn default() -> Self {
        Self {
            characters: (0..CHARACTER_SLOTS).map(Character::empty).collect(),
        }
    }
}

impl CharacterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[Character] {
        &self.characters
    }

    pub fn active(&self) -> impl Iterator<Item = &Character> {
        self.characters.iter().filter(|c| c.is_active())
    }

    pub fn get(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Character> {
        self.characters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoryboardError::ValidationError(format!("Unknown character: {}", id)))
    }

    /// Setting an image also marks the character as included.
    pub fn set_image(&mut self, id: &str, image: CharacterImage) -> Result<()> {
        let character = self.get_mut(id)?;
        character.image = Some(image);
        character.included = character.has_image();
        Ok(())
    }

    pub fn clear_image(&mut self, id: &str) -> Result<()> {
        let character = self.get_mut(id)?;
        character.image = None;
        character.included = false;
        Ok(())
    }

    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> Result<()> {
        self.get_mut(id)?.name = name.into();
        Ok(())
    }

    /// Flips inclusion; characters without an image stay excluded.
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let character = self.get_mut(id)?;
        if character.has_image() {
            character.included = !character.included;
        }
        Ok(character.included)
    }

    pub fn set_included(&mut self, id: &str, included: bool) -> Result<()> {
        let character = self.get_mut(id)?;
        character.included = included && character.has_image();
        Ok(())
    }
}
