use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoryboardError};

pub const MAX_PROMPTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptItem {
    pub id: String,
    pub text: String,
}

impl PromptItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Ordered scene prompts. Always holds between 1 and `MAX_PROMPTS` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptList {
    items: Vec<PromptItem>,
}

impl Default for PromptList {
    fn default() -> Self {
        Self {
            items: vec![PromptItem::new("p-1", "")],
        }
    }
}

impl PromptList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[PromptItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= MAX_PROMPTS
    }

    pub fn add(&mut self, text: impl Into<String>) -> Result<&PromptItem> {
        if self.is_full() {
            return Err(StoryboardError::PromptLimit(MAX_PROMPTS));
        }

        let id = self.next_id();
        self.items.push(PromptItem::new(id, text));
        Ok(&self.items[self.items.len() - 1])
    }

    /// Removes a prompt unless it is the last one left. Returns whether it was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.items.len() <= 1 {
            return false;
        }
        let before = self.items.len();
        self.items.retain(|p| p.id != id);
        self.items.len() != before
    }

    pub fn update(&mut self, id: &str, text: impl Into<String>) -> Result<()> {
        let item = self
            .items
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoryboardError::ValidationError(format!("Unknown prompt: {}", id)))?;
        item.text = text.into();
        Ok(())
    }

    fn next_id(&self) -> String {
        let base = format!("p-{}", Utc::now().timestamp_millis());
        let mut id = base.clone();
        let mut n = 1;
        while self.items.iter().any(|p| p.id == id) {
            id = format!("{}-{}", base, n);
            n += 1;
        }
        id
    }
}
