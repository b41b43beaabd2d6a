//! Common traits and types for prediction services

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TransferError};
use crate::preprocess::EncodedImage;

/// Lifecycle state of a remote prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Queued,
    Processing,
    Succeeded,
    Failed,
}

impl PredictionStatus {
    /// Map a status string reported by the service
    pub fn parse(status: &str) -> Result<Self> {
        match status.trim().to_ascii_lowercase().as_str() {
            "starting" | "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "succeeded" => Ok(Self::Succeeded),
            "failed" | "canceled" | "cancelled" => Ok(Self::Failed),
            other => Err(TransferError::MalformedResponse(format!(
                "unknown prediction status '{}'",
                other
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Snapshot of a remote prediction. Each status check yields a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionJob {
    pub id: String,
    /// Status URL handed out by the service, if any
    pub status_url: Option<String>,
    pub status: PredictionStatus,
    /// Result image locators
    pub output: Vec<String>,
    /// Provider error text for failed predictions
    pub error: Option<String>,
}

impl PredictionJob {
    /// First usable output locator
    pub fn first_output(&self) -> Option<&str> {
        self.output
            .iter()
            .map(|url| url.trim())
            .find(|url| !url.is_empty())
    }
}

/// Output field as sent by the service: a single locator or a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PredictionOutput {
    One(String),
    Many(Vec<String>),
}

impl PredictionOutput {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(url) => vec![url],
            Self::Many(urls) => urls,
        }
    }
}

/// Request to start a style transfer prediction
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub image: EncodedImage,
    pub prompt: String,
    pub style: Option<String>,
}

/// Trait for services that run style transfer predictions
#[async_trait]
pub trait PredictionService: Send + Sync {
    /// Get the service name
    fn name(&self) -> &str;

    /// Create a new prediction
    async fn submit(&self, request: SubmitRequest) -> Result<PredictionJob>;

    /// Fetch a fresh snapshot of a prediction
    async fn status(&self, job: &PredictionJob) -> Result<PredictionJob>;

    /// Download a result image
    async fn fetch_output(&self, url: &str) -> Result<Vec<u8>>;
}
