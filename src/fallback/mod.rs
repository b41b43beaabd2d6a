//! Local stand-in used when the real pipeline cannot produce a result

use std::time::Duration;
use tracing::info;

use crate::config::FallbackConfig;
use crate::pipeline::TransferResult;
use crate::preprocess::SourceImage;
use crate::progress::{ProgressSender, Stage};

/// Echoes the source photo back with a simulated progress sequence
#[derive(Debug, Clone)]
pub struct Simulator {
    step_percent: u8,
    tick: Duration,
}

impl Simulator {
    pub fn new(config: &FallbackConfig) -> Self {
        Self {
            step_percent: config.step_percent.max(1),
            tick: Duration::from_millis(config.tick_ms),
        }
    }

    /// Percentages reported while simulating: 0, step, 2*step, ... 100
    pub fn steps(&self) -> Vec<u8> {
        let mut steps: Vec<u8> = (0..100u8).step_by(self.step_percent as usize).collect();
        steps.push(100);
        steps
    }

    /// Produce a successful, mock-tagged result from the original image
    pub async fn simulate(&self, image: &SourceImage, progress: &ProgressSender) -> TransferResult {
        info!(size = image.data.len(), "Simulating style transfer locally");

        let steps = self.steps();
        let last = steps.len() - 1;
        for (i, percent) in steps.into_iter().enumerate() {
            progress.emit(
                Stage::Simulating,
                percent,
                format!("Simulating style transfer: {}%", percent),
            );
            if i < last {
                tokio::time::sleep(self.tick).await;
            }
        }

        progress.emit(Stage::Done, 100, "Done (simulated result)");
        TransferResult::simulated(image)
    }
}
