//! The normalized value handed back to callers

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use crate::preprocess::SourceImage;

/// Where a caller can find the result image locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResultHandle {
    /// Written to the result store; release it when done
    File(PathBuf),
    /// Self-contained; nothing to release
    DataUrl(String),
}

/// Outcome of one style transfer
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub success: bool,
    pub handle: Option<ResultHandle>,
    #[serde(skip)]
    pub image: Option<Vec<u8>>,
    /// Locator reported by the prediction service
    pub remote_url: Option<String>,
    /// Set when the image was produced by the local simulator
    pub is_mock: bool,
    /// Why the real pipeline was abandoned, if it was
    pub fallback_reason: Option<String>,
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl TransferResult {
    /// A real result fetched from the prediction service
    pub fn completed(path: PathBuf, image: Vec<u8>, remote_url: String) -> Self {
        Self {
            success: true,
            handle: Some(ResultHandle::File(path)),
            image: Some(image),
            remote_url: Some(remote_url),
            is_mock: false,
            fallback_reason: None,
            error: None,
            completed_at: Utc::now(),
        }
    }

    /// A stand-in result echoing the source photo
    pub fn simulated(source: &SourceImage) -> Self {
        Self {
            success: true,
            handle: Some(ResultHandle::DataUrl(source.to_data_url())),
            image: Some(source.data.clone()),
            remote_url: None,
            is_mock: true,
            fallback_reason: None,
            error: None,
            completed_at: Utc::now(),
        }
    }

    /// The caller abandoned the transfer before it finished
    pub fn cancelled() -> Self {
        Self {
            success: false,
            handle: None,
            image: None,
            remote_url: None,
            is_mock: false,
            fallback_reason: None,
            error: Some("cancelled".to_string()),
            completed_at: Utc::now(),
        }
    }

    pub fn with_fallback_reason(mut self, reason: impl Into<String>) -> Self {
        self.fallback_reason = Some(reason.into());
        self
    }

    /// Path of a file-backed result
    pub fn file_path(&self) -> Option<&PathBuf> {
        match &self.handle {
            Some(ResultHandle::File(path)) => Some(path),
            _ => None,
        }
    }
}
