//! Local storage for fetched style transfer results

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

/// Writes result images to disk so callers get a locally addressable handle
#[derive(Debug, Clone)]
pub struct ResultStore {
    storage_path: PathBuf,
}

impl ResultStore {
    /// Create a new result store
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.storage_path
    }

    /// Ensure the storage directory exists
    pub async fn ensure_storage_dir(&self) -> Result<()> {
        if !self.storage_path.exists() {
            fs::create_dir_all(&self.storage_path).await?;
            debug!(path = ?self.storage_path, "Created storage directory");
        }
        Ok(())
    }

    /// Save raw image data under a fresh file name and return its path
    pub async fn save(&self, data: &[u8]) -> Result<PathBuf> {
        self.ensure_storage_dir().await?;

        let format = detect_image_format(data).unwrap_or("bin");
        let filename = format!("{}.{}", Uuid::new_v4(), format);
        let file_path = self.storage_path.join(&filename);

        fs::write(&file_path, data).await?;

        debug!(path = ?file_path, size = data.len(), "Saved result image");

        Ok(file_path)
    }

    /// Delete a stored image
    pub async fn delete(&self, path: &Path) -> Result<()> {
        fs::remove_file(self.resolve(path)).await?;
        debug!(path = ?path, "Released result image");
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.starts_with(&self.storage_path) {
            path.to_path_buf()
        } else {
            self.storage_path.join(path)
        }
    }
}

/// Detect image format from binary data using magic bytes
pub fn detect_image_format(data: &[u8]) -> Option<&'static str> {
    if data.len() < 8 {
        return None;
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("png");
    }

    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpg");
    }

    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("gif");
    }

    // WebP: RIFF....WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("webp");
    }

    if data.starts_with(b"BM") {
        return Some("bmp");
    }

    None
}
