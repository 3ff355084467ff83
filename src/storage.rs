// SPDX-License-Identifier: GPL-3.0-only

//! Storage utilities for saving composites

use crate::config::DEFAULT_SAVE_FOLDER;
use crate::constants::composite::DOWNLOAD_PREFIX;
use crate::errors::{AppError, AppResult};
use crate::pipelines::composite::CompositeImage;
use crate::pipelines::photo::EncodingFormat;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default directory for saved composites (Pictures/PhotoBooth)
pub fn default_output_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_SAVE_FOLDER)
}

/// Download file name for a composite made at `unix_millis`
pub fn download_file_name(unix_millis: i64) -> String {
    format!(
        "{}-{}.{}",
        DOWNLOAD_PREFIX,
        unix_millis,
        EncodingFormat::Png.extension()
    )
}

/// Write a composite into `dir` under a timestamped name
///
/// Creates `dir` if needed and returns the written path.
pub async fn save_composite(image: &CompositeImage, dir: &Path) -> AppResult<PathBuf> {
    let path = dir.join(download_file_name(chrono::Utc::now().timestamp_millis()));
    write_composite(image, &path).await?;
    Ok(path)
}

/// Write a composite to an explicit path
pub async fn write_composite(image: &CompositeImage, path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::Storage(format!("{}: {}", parent.display(), e)))?;
    }
    tokio::fs::write(path, &image.png)
        .await
        .map_err(|e| AppError::Storage(format!("{}: {}", path.display(), e)))?;

    info!(
        path = %path.display(),
        width = image.width,
        height = image.height,
        bytes = image.png.len(),
        "Composite saved"
    );
    Ok(())
}
