//! Input image preparation - decode, bound the width, re-encode as JPEG

pub mod encoding;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::error::{Result, TransferError};
use crate::storage::detect_image_format;

/// A photo supplied by the caller. The core only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl SourceImage {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Build from raw bytes, sniffing the MIME type from magic bytes
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let mime_type = mime_for_format(detect_image_format(&data));
        Self { data, mime_type }
    }

    /// Read an image file from disk
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref()).await?;
        debug!(path = ?path.as_ref(), size = data.len(), "Loaded source image");
        Ok(Self::from_bytes(data))
    }

    /// Natural width and height, read from the image header
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        image::ImageReader::new(std::io::Cursor::new(&self.data))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| TransferError::Decode(e.to_string()))
    }

    /// The original bytes as a self-contained data URL
    pub fn to_data_url(&self) -> String {
        encoding::create_data_url(&self.data, &self.mime_type)
    }
}

fn mime_for_format(format: Option<&str>) -> String {
    match format {
        Some("jpg") => "image/jpeg".to_string(),
        Some(other) => format!("image/{}", other),
        None => "application/octet-stream".to_string(),
    }
}

/// A resized, re-encoded image ready to be sent to the prediction service
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Base64 encoded payload
    pub data: String,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        encoding::data_url(&self.content_type, &self.data)
    }

    /// Decode the payload back into raw bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encoding::decode(&self.data)
    }
}

/// Target size for an image whose width may exceed `max_dimension`.
///
/// Width is the bounded edge: wider images are scaled so the width equals
/// `max_dimension` and the height keeps the aspect ratio (rounded, at least 1px).
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension {
        return (width, height);
    }

    let scaled = (height as f64 * max_dimension as f64 / width as f64).round() as u32;
    (max_dimension, scaled.max(1))
}

/// Decode `image`, bound its width to `max_dimension` and re-encode as JPEG
pub fn resize(image: &SourceImage, max_dimension: u32, quality: u8) -> Result<EncodedImage> {
    let decoded = image::load_from_memory(&image.data)
        .map_err(|e| TransferError::Decode(e.to_string()))?;

    let (width, height) = (decoded.width(), decoded.height());
    let (new_width, new_height) = target_dimensions(width, height, max_dimension);

    let resized = if (new_width, new_height) == (width, height) {
        decoded
    } else {
        decoded.resize_exact(new_width, new_height, FilterType::Triangle)
    };

    let bytes = encode_jpeg(&resized, quality)?;
    debug!(
        from_width = width,
        from_height = height,
        width = new_width,
        height = new_height,
        size = bytes.len(),
        "Prepared image for submission"
    );

    Ok(EncodedImage {
        data: encoding::encode(&bytes),
        content_type: "image/jpeg".to_string(),
        width: new_width,
        height: new_height,
    })
}

/// Encode to JPEG, flattening any alpha channel
fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))
        .map_err(|e| TransferError::Encode(e.to_string()))?;
    Ok(bytes)
}
