//! File system utilities.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::Result;

/// Copy `path` to `{path}.{YYYYmmddHHMMSS}.bak`.
///
/// Returns `None` when there is nothing to back up.
pub async fn create_backup(path: &Path) -> Result<Option<PathBuf>> {
    if !tokio::fs::try_exists(path).await? {
        log::warn!("Nothing to back up, {} does not exist", path.display());
        return Ok(None);
    }

    let mut backup = path.as_os_str().to_owned();
    backup.push(format!(".{}.bak", Local::now().format("%Y%m%d%H%M%S")));
    let backup = PathBuf::from(backup);

    tokio::fs::copy(path, &backup).await?;
    log::info!("Backed up {} to {}", path.display(), backup.display());
    Ok(Some(backup))
}

/// Save data to a JSON file with pretty printing
pub async fn save_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    ensure_parent(path).await?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Ensure the parent directory of a file exists
pub async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}
