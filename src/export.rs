use crate::{
    error::{Result, StoryboardError},
    models::{DataUri, ResultSlot},
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Write one generated image to `<dir>/<file_name>`.
pub async fn save_slot(slot: &ResultSlot, dir: impl AsRef<Path>) -> Result<PathBuf> {
    if !slot.is_success() || slot.image_data.is_empty() {
        return Err(StoryboardError::SlotNotReady(slot.id.clone()));
    }

    let uri: DataUri = slot.image_data.parse()?;
    let bytes = uri.decode()?;

    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&slot.file_name);
    tokio::fs::write(&path, &bytes).await?;

    log::info!("💾 Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// Save every successful slot in order, pausing `stagger` between files.
pub async fn save_all(
    slots: &[ResultSlot],
    dir: impl AsRef<Path>,
    stagger: Duration,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let ready: Vec<&ResultSlot> = slots.iter().filter(|s| s.is_success()).collect();
    if ready.is_empty() {
        log::warn!("No generated images to save");
        return Ok(Vec::new());
    }

    let mut saved = Vec::with_capacity(ready.len());
    for (index, slot) in ready.into_iter().enumerate() {
        if index > 0 && !stagger.is_zero() {
            tokio::time::sleep(stagger).await;
        }
        saved.push(save_slot(slot, dir).await?);
    }
    Ok(saved)
}
