//! Common error types for the style transfer client

use thiserror::Error;

/// Errors raised anywhere in the real prediction pipeline
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Prediction submission failed with status {status}: {body}")]
    Submission { status: u16, body: String },

    #[error("Status check failed: {message}")]
    Poll { status: Option<u16>, message: String },

    #[error("Prediction failed: {0}")]
    RemoteFailure(String),

    #[error("Prediction did not finish after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("Prediction {0} succeeded without any output")]
    EmptyResult(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransferError {
    /// Whether a status check that failed this way is worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            TransferError::HttpClient(e) => e.is_connect() || e.is_timeout(),
            TransferError::Poll { status: None, .. } => true,
            TransferError::Poll {
                status: Some(code), ..
            } => *code >= 500 || *code == 429,
            _ => false,
        }
    }

    /// Short machine-readable name used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::Config(_) => "config_error",
            TransferError::Io(_) => "io_error",
            TransferError::Json(_) => "json_error",
            TransferError::HttpClient(_) => "http_error",
            TransferError::Decode(_) => "decode_error",
            TransferError::Encode(_) => "encode_error",
            TransferError::Submission { .. } => "submission_error",
            TransferError::Poll { .. } => "poll_error",
            TransferError::RemoteFailure(_) => "remote_failure",
            TransferError::Timeout { .. } => "timeout",
            TransferError::EmptyResult(_) => "empty_result",
            TransferError::MalformedResponse(_) => "malformed_response",
            TransferError::Cancelled => "cancelled",
            TransferError::Internal(_) => "internal_error",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TransferError>;
