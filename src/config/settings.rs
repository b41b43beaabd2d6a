//! Client settings and configuration management

use crate::error::{Result, TransferError};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Prediction service (or the proxy in front of it)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_predictions_path")]
    pub predictions_path: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Bearer token for the proxy itself, never a provider secret
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_predictions_path() -> String {
    "/predictions".to_string()
}

fn default_request_timeout() -> u64 {
    30000
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            predictions_path: default_predictions_path(),
            request_timeout_ms: default_request_timeout(),
            api_key: None,
        }
    }
}

impl ServiceConfig {
    /// URL that new predictions are posted to
    pub fn predictions_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.predictions_path
        )
    }

    /// Status URL used when the service did not hand out its own
    pub fn prediction_url(&self, id: &str) -> String {
        format!("{}/{}", self.predictions_url().trim_end_matches('/'), id)
    }
}

/// Fixed generation parameters, chosen once per deployment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default = "default_inference_steps")]
    pub num_inference_steps: u32,
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f32,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default = "default_output_quality")]
    pub output_quality: u8,
    /// How strongly the source photo conditions the result
    #[serde(default = "default_prompt_strength")]
    pub prompt_strength: f32,
    #[serde(default = "default_negative_prompt")]
    pub negative_prompt: Option<String>,
}

fn default_inference_steps() -> u32 {
    30
}

fn default_guidance_scale() -> f32 {
    7.5
}

fn default_output_format() -> String {
    "jpg".to_string()
}

fn default_output_quality() -> u8 {
    90
}

fn default_prompt_strength() -> f32 {
    0.55
}

fn default_negative_prompt() -> Option<String> {
    Some("blurry, low quality, distorted, deformed, watermark, text".to_string())
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            num_inference_steps: default_inference_steps(),
            guidance_scale: default_guidance_scale(),
            output_format: default_output_format(),
            output_quality: default_output_quality(),
            prompt_strength: default_prompt_strength(),
            negative_prompt: default_negative_prompt(),
        }
    }
}

/// Input image preparation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreprocessConfig {
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_max_dimension() -> u32 {
    768
}

fn default_jpeg_quality() -> u8 {
    92
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// Status polling budget and progress curve
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_progress_base")]
    pub progress_base: u32,
    #[serde(default = "default_progress_rate")]
    pub progress_rate: u32,
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_max_attempts() -> u32 {
    60
}

fn default_progress_base() -> u32 {
    10
}

fn default_progress_rate() -> u32 {
    2
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            max_attempts: default_max_attempts(),
            progress_base: default_progress_base(),
            progress_rate: default_progress_rate(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Simulated progress used by the fallback path
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackConfig {
    #[serde(default = "default_step_percent")]
    pub step_percent: u8,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_step_percent() -> u8 {
    10
}

fn default_tick_ms() -> u64 {
    200
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            step_percent: default_step_percent(),
            tick_ms: default_tick_ms(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub base_path: String,
}

fn default_storage_path() -> String {
    "./styled_images".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_storage_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn invalid(message: impl Into<String>) -> TransferError {
    TransferError::Config(config::ConfigError::Message(message.into()))
}

impl Settings {
    /// Load settings from a configuration file, overridden by environment variables
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path
            .as_ref()
            .to_str()
            .ok_or_else(|| invalid("Configuration path is not valid UTF-8"))?;

        let config = Config::builder()
            // Start with default values
            .set_default("service.base_url", default_base_url())?
            .set_default("polling.interval_ms", default_poll_interval())?
            .set_default("polling.max_attempts", default_max_attempts())?
            .set_default("preprocess.max_dimension", default_max_dimension())?
            // Load from configuration file
            .add_source(File::with_name(path).required(false))
            // Override with environment variables (prefixed with STYLE_TRANSFER_)
            .add_source(
                Environment::with_prefix("STYLE_TRANSFER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.service.base_url.trim().is_empty() {
            return Err(invalid("Service base URL cannot be empty"));
        }

        if self.preprocess.max_dimension == 0 {
            return Err(invalid("Maximum image dimension cannot be 0"));
        }

        if !(1..=100).contains(&self.preprocess.jpeg_quality) {
            return Err(invalid(format!(
                "JPEG quality {} is out of range. Must be between 1 and 100",
                self.preprocess.jpeg_quality
            )));
        }

        if self.polling.interval_ms == 0 {
            return Err(invalid("Poll interval cannot be 0"));
        }

        if self.polling.max_attempts == 0 {
            return Err(invalid("Maximum poll attempts cannot be 0"));
        }

        if self.fallback.step_percent == 0 {
            return Err(invalid("Simulated progress step cannot be 0"));
        }

        if !["jpg", "png", "webp"].contains(&self.generation.output_format.as_str()) {
            return Err(invalid(format!(
                "Output format '{}' is invalid. Must be 'jpg', 'png' or 'webp'",
                self.generation.output_format
            )));
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(invalid(format!(
                "Log format '{}' is invalid. Must be 'json' or 'pretty'",
                self.logging.format
            )));
        }

        Ok(())
    }
}
