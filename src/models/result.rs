use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::models::prompt::PromptItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Idle,
    Loading,
    Success,
    Error,
}

impl SlotStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SlotStatus::Success | SlotStatus::Error)
    }
}

/// One tracked generation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSlot {
    pub id: String,
    pub prompt_text: String,
    /// Data URI once generated, empty otherwise.
    pub image_data: String,
    pub file_name: String,
    pub status: SlotStatus,
    pub error: Option<String>,
}

impl ResultSlot {
    /// A fresh `loading` slot for the prompt at `index` (0-based) of a batch.
    pub fn pending<Tz: TimeZone>(
        prompt: &PromptItem,
        index: usize,
        created_at: &DateTime<Tz>,
    ) -> Self {
        Self {
            id: format!("{}-{}", prompt.id, created_at.timestamp_millis()),
            prompt_text: prompt.text.clone(),
            image_data: String::new(),
            file_name: file_name_for(index + 1, created_at.date_naive()),
            status: SlotStatus::Loading,
            error: None,
        }
    }

    pub fn start_loading(&mut self) {
        self.status = SlotStatus::Loading;
        self.error = None;
    }

    pub fn succeed(&mut self, image_data: String) {
        self.image_data = image_data;
        self.status = SlotStatus::Success;
        self.error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = SlotStatus::Error;
        self.error = Some(message.into());
    }

    pub fn is_success(&self) -> bool {
        self.status == SlotStatus::Success
    }
}

/// `001_10Nov2025.png` style export name.
pub fn file_name_for(sequence: usize, date: NaiveDate) -> String {
    format!("{:03}_{}.png", sequence, format_date(date))
}

/// `DDMonYYYY`, e.g. `10Nov2025`.
pub fn format_date(date: NaiveDate) -> String {
    format!("{:02}{}{}", date.day(), date.format("%b"), date.year())
}

pub fn today() -> DateTime<Local> {
    Local::now()
}
