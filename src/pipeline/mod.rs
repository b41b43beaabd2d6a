//! Orchestration entry point
//!
//! Runs the real pipeline (prepare, submit, poll, download) and substitutes the
//! local simulator whenever any stage fails. Callers always get a result back.

pub mod result;

pub use result::{ResultHandle, TransferResult};

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::{HttpPredictionClient, PredictionService, SubmitRequest};
use crate::config::{PreprocessConfig, Settings};
use crate::error::{Result, TransferError};
use crate::fallback::Simulator;
use crate::polling::{PollOutcome, Poller};
use crate::preprocess::{self, SourceImage};
use crate::progress::{self, ProgressSender, ProgressStream, Stage};
use crate::prompt::{PromptTable, StyleDescriptor};
use crate::storage::ResultStore;

/// Percentage reported once the job is handed to the service
const SUBMIT_PROGRESS: u8 = 5;

/// A finished prediction and its downloaded image
struct Fetched {
    outcome: PollOutcome,
    bytes: Vec<u8>,
}

/// Style transfer orchestrator
pub struct StyleTransfer {
    service: Arc<dyn PredictionService>,
    prompts: PromptTable,
    preprocess: PreprocessConfig,
    poller: Poller,
    simulator: Simulator,
    store: ResultStore,
}

impl StyleTransfer {
    /// Create an orchestrator talking to the configured HTTP service
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = HttpPredictionClient::new(&settings.service, &settings.generation)?;
        Ok(Self::with_service(settings, Arc::new(client)))
    }

    /// Create an orchestrator around any prediction service
    pub fn with_service(settings: &Settings, service: Arc<dyn PredictionService>) -> Self {
        Self {
            service,
            prompts: PromptTable::default(),
            preprocess: settings.preprocess.clone(),
            poller: Poller::new(settings.polling.clone()),
            simulator: Simulator::new(&settings.fallback),
            store: ResultStore::new(&settings.storage.base_path),
        }
    }

    /// Replace the built-in prompt keyword tables
    pub fn with_prompts(mut self, prompts: PromptTable) -> Self {
        self.prompts = prompts;
        self
    }

    /// Re-render `image` in `style`, falling back to a simulated result on failure
    pub async fn process(
        &self,
        image: &SourceImage,
        style: &StyleDescriptor,
        progress: &ProgressSender,
    ) -> TransferResult {
        self.process_with_cancel(image, style, progress, CancellationToken::new())
            .await
    }

    /// Like [`process`](Self::process), but stops as soon as `cancel` fires
    ///
    /// Cancellation is observed up to the download; a fetched result is only
    /// written to the store when the transfer is still wanted.
    pub async fn process_with_cancel(
        &self,
        image: &SourceImage,
        style: &StyleDescriptor,
        progress: &ProgressSender,
        cancel: CancellationToken,
    ) -> TransferResult {
        let fetched = tokio::select! {
            _ = cancel.cancelled() => return Self::cancelled(),
            fetched = self.fetch_remote(image, style, progress) => fetched,
        };
        if cancel.is_cancelled() {
            return Self::cancelled();
        }

        let error = match fetched {
            Ok(fetched) => match self.store_result(fetched, progress).await {
                Ok(result) => return result,
                Err(e) => e,
            },
            Err(e) => e,
        };

        warn!(
            error = %error,
            kind = error.kind(),
            service = %self.service.name(),
            "Style transfer failed, using simulated result"
        );
        tokio::select! {
            _ = cancel.cancelled() => Self::cancelled(),
            result = self.simulator.simulate(image, progress) => {
                result.with_fallback_reason(error.to_string())
            }
        }
    }

    /// The real pipeline alone, surfacing every failure
    pub async fn run_remote(
        &self,
        image: &SourceImage,
        style: &StyleDescriptor,
        progress: &ProgressSender,
    ) -> Result<TransferResult> {
        let fetched = self.fetch_remote(image, style, progress).await?;
        self.store_result(fetched, progress).await
    }

    fn cancelled() -> TransferResult {
        info!("Style transfer cancelled");
        TransferResult::cancelled()
    }

    /// Prepare, submit, poll and download; nothing is written locally
    async fn fetch_remote(
        &self,
        image: &SourceImage,
        style: &StyleDescriptor,
        progress: &ProgressSender,
    ) -> Result<Fetched> {
        progress.emit(Stage::Preparing, 0, "Preparing image");
        let encoded = {
            let image = image.clone();
            let max_dimension = self.preprocess.max_dimension;
            let quality = self.preprocess.jpeg_quality;
            tokio::task::spawn_blocking(move || {
                preprocess::resize(&image, max_dimension, quality)
            })
            .await
            .map_err(|e| TransferError::Internal(format!("Image preparation panicked: {}", e)))??
        };

        let prompt = self.prompts.build_prompt(style);
        let category = style.category.trim();

        // Never ahead of the first polling estimate
        let submitting = SUBMIT_PROGRESS.min(self.poller.progress_for(0));
        progress.emit(Stage::Submitting, submitting, "Submitting to the painter");
        let job = self
            .service
            .submit(SubmitRequest {
                image: encoded,
                prompt,
                style: (!category.is_empty()).then(|| category.to_string()),
            })
            .await?;
        info!(job_id = %job.id, status = %job.status, artist = %style.artist, "Prediction submitted");

        let outcome = self.poller.run(self.service.as_ref(), job, progress).await?;

        progress.emit(Stage::Downloading, 97, "Downloading result");
        let bytes = self.service.fetch_output(&outcome.output_url).await?;

        Ok(Fetched { outcome, bytes })
    }

    async fn store_result(
        &self,
        fetched: Fetched,
        progress: &ProgressSender,
    ) -> Result<TransferResult> {
        let Fetched { outcome, bytes } = fetched;
        let path = self.store.save(&bytes).await?;

        progress.emit(Stage::Done, 100, "Done");
        info!(job_id = %outcome.job.id, path = ?path, "Style transfer complete");

        Ok(TransferResult::completed(path, bytes, outcome.output_url))
    }

    /// Delete the local file behind a result, if it has one
    pub async fn release(&self, result: &TransferResult) -> Result<()> {
        match result.file_path() {
            Some(path) => self.store.delete(path).await,
            None => Ok(()),
        }
    }
}

/// Run a transfer on its own task, returning its progress stream and result handle
pub fn spawn(
    transfer: Arc<StyleTransfer>,
    image: SourceImage,
    style: StyleDescriptor,
    cancel: CancellationToken,
) -> (ProgressStream, JoinHandle<TransferResult>) {
    let (tx, rx) = progress::channel();
    let handle = tokio::spawn(async move {
        transfer
            .process_with_cancel(&image, &style, &tx, cancel)
            .await
    });
    (rx, handle)
}
