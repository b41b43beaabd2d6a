//! Unit tests for image preparation

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use style_transfer_client::preprocess::{encoding, resize, SourceImage};
use style_transfer_client::TransferError;

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

fn decoded_dimensions(data_url: &str) -> (u32, u32) {
    let bytes = encoding::decode(data_url).unwrap();
    let image = image::load_from_memory(&bytes).unwrap();
    (image.width(), image.height())
}

#[test]
fn test_wide_image_is_downscaled() {
    let source = SourceImage::from_bytes(encode(DynamicImage::new_rgb8(2000, 1000), ImageFormat::Png));

    let encoded = resize(&source, 768, 92).unwrap();

    assert_eq!((encoded.width, encoded.height), (768, 384));
    assert_eq!(decoded_dimensions(&encoded.data_url()), (768, 384));
}

#[test]
fn test_aspect_ratio_rounding() {
    let source = SourceImage::from_bytes(encode(DynamicImage::new_rgb8(1000, 667), ImageFormat::Png));

    let encoded = resize(&source, 768, 92).unwrap();

    // 667 * 768 / 1000 = 512.256
    assert_eq!((encoded.width, encoded.height), (768, 512));
}

#[test]
fn test_small_image_keeps_dimensions() {
    let original = encode(DynamicImage::new_rgb8(300, 200), ImageFormat::Png);
    let source = SourceImage::from_bytes(original.clone());

    let encoded = resize(&source, 768, 92).unwrap();

    assert_eq!((encoded.width, encoded.height), (300, 200));
    // Re-encoded as JPEG even though nothing was scaled
    let bytes = encoded.to_bytes().unwrap();
    assert_ne!(bytes, original);
    assert!(bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
    // Source untouched
    assert_eq!(source.data, original);
}

#[test]
fn test_transparent_png_is_flattened() {
    let source = SourceImage::from_bytes(encode(DynamicImage::new_rgba8(50, 50), ImageFormat::Png));

    let encoded = resize(&source, 768, 90).unwrap();

    assert_eq!(encoded.content_type, "image/jpeg");
    assert_eq!(decoded_dimensions(&encoded.data_url()), (50, 50));
}

#[test]
fn test_corrupt_image_is_decode_error() {
    let mut truncated = encode(DynamicImage::new_rgb8(64, 64), ImageFormat::Png);
    truncated.truncate(20);
    let source = SourceImage::new(truncated, "image/png");

    let result = resize(&source, 768, 92);

    assert!(matches!(result, Err(TransferError::Decode(_))));
}

#[tokio::test]
async fn test_source_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    std::fs::write(&path, encode(DynamicImage::new_rgb8(40, 30), ImageFormat::Jpeg)).unwrap();

    let source = SourceImage::from_path(&path).await.unwrap();

    assert_eq!(source.mime_type, "image/jpeg");
    assert_eq!(source.dimensions().unwrap(), (40, 30));
}
