//! Base64 and data URL helpers for transport-ready images

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{Result, TransferError};

/// Encode binary data to base64 string
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode base64 string to binary data
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    // Handle data URL format (e.g., "data:image/png;base64,...")
    let data = match encoded.split_once(',') {
        Some((_, payload)) => payload,
        None => encoded,
    };

    STANDARD
        .decode(data.trim())
        .map_err(|e| TransferError::Decode(format!("Invalid base64 data: {}", e)))
}

/// Create a data URL from an already base64 encoded payload
pub fn data_url(content_type: &str, encoded: &str) -> String {
    format!("data:{};base64,{}", content_type, encoded)
}

/// Create a data URL from binary image data
pub fn create_data_url(data: &[u8], content_type: &str) -> String {
    data_url(content_type, &encode(data))
}
