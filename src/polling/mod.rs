//! Status polling for submitted predictions
//!
//! The poller waits one interval, issues exactly one status check, and repeats
//! until the prediction reaches a terminal state or the attempt budget is spent.
//! The wait is a rate limit and is never skipped.

use tracing::{debug, info, warn};

use crate::client::traits::{PredictionJob, PredictionService, PredictionStatus};
use crate::config::PollingConfig;
use crate::error::{Result, TransferError};
use crate::progress::{ProgressSender, Stage};

/// Highest percentage reported before a result is confirmed
pub const MAX_POLLING_PROGRESS: u8 = 95;

/// A prediction that finished successfully
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub job: PredictionJob,
    /// Canonical result locator
    pub output_url: String,
    /// Status checks issued
    pub attempts: u32,
}

/// Drives a prediction to a terminal state
#[derive(Debug, Clone)]
pub struct Poller {
    config: PollingConfig,
}

impl Poller {
    pub fn new(config: PollingConfig) -> Self {
        Self { config }
    }

    /// Progress estimate after `attempts` status checks
    pub fn progress_for(&self, attempts: u32) -> u8 {
        let estimate = self
            .config
            .progress_base
            .saturating_add(attempts.saturating_mul(self.config.progress_rate));
        estimate.min(MAX_POLLING_PROGRESS as u32) as u8
    }

    /// Trailing run of transient failures, at least half the budget, that
    /// counts as a persistent transport failure rather than a timeout
    fn persistent_failure_threshold(&self) -> u32 {
        self.config.max_attempts.div_ceil(2).max(1)
    }

    /// Poll `job` until it succeeds, fails, or the attempt budget runs out
    pub async fn run(
        &self,
        service: &dyn PredictionService,
        job: PredictionJob,
        progress: &ProgressSender,
    ) -> Result<PollOutcome> {
        let mut job = job;
        let mut attempts = 0u32;
        let mut last_transient: Option<TransferError> = None;
        let mut consecutive_failures = 0u32;

        while !job.status.is_terminal() {
            if attempts >= self.config.max_attempts {
                return Err(match last_transient {
                    Some(e) if consecutive_failures >= self.persistent_failure_threshold() => {
                        warn!(job_id = %job.id, attempts, consecutive_failures, error = %e, "Status checks kept failing");
                        TransferError::RemoteFailure(format!(
                            "status checks kept failing for {} of {} attempts: {}",
                            consecutive_failures, attempts, e
                        ))
                    }
                    _ => {
                        warn!(job_id = %job.id, attempts, status = %job.status, "Prediction timed out");
                        TransferError::Timeout { attempts }
                    }
                });
            }

            tokio::time::sleep(self.config.interval()).await;
            attempts += 1;

            match service.status(&job).await {
                Ok(next) => {
                    job = next;
                    last_transient = None;
                    consecutive_failures = 0;
                }
                Err(e) if e.is_transient() => {
                    consecutive_failures += 1;
                    debug!(job_id = %job.id, attempt = attempts, error = %e, "Transient status check failure");
                    last_transient = Some(e);
                }
                Err(e) => return Err(e),
            }

            let percent = self.progress_for(attempts);
            let stage = match job.status {
                PredictionStatus::Queued => Stage::Queued,
                _ => Stage::Processing,
            };
            progress.emit(
                stage,
                percent,
                format!("Painting in progress ({}): {}%", job.status, percent),
            );
            debug!(job_id = %job.id, attempt = attempts, status = %job.status, percent, "Polled prediction");
        }

        match job.status {
            PredictionStatus::Succeeded => {
                let output_url = job
                    .first_output()
                    .map(str::to_string)
                    .ok_or_else(|| TransferError::EmptyResult(job.id.clone()))?;
                info!(job_id = %job.id, attempts, output = %output_url, "Prediction succeeded");
                Ok(PollOutcome {
                    job,
                    output_url,
                    attempts,
                })
            }
            _ => {
                let reason = job
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("prediction {} reported failure", job.id));
                warn!(job_id = %job.id, attempts, error = %reason, "Prediction failed");
                Err(TransferError::RemoteFailure(reason))
            }
        }
    }
}
