//! Functional tests for the full style transfer pipeline against a mock service

use image::{DynamicImage, ImageFormat};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use style_transfer_client::config::Settings;
use style_transfer_client::preprocess::encoding;
use style_transfer_client::progress::{self, ProgressEvent, Stage};
use style_transfer_client::{ResultHandle, SourceImage, StyleDescriptor, StyleTransfer};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_for(server: &MockServer, storage: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.service.base_url = server.uri();
    settings.polling.interval_ms = 10;
    settings.polling.max_attempts = 20;
    settings.fallback.tick_ms = 1;
    settings.storage.base_path = storage.path().to_string_lossy().to_string();
    settings
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut buffer, format)
        .unwrap();
    buffer.into_inner()
}

fn van_gogh() -> StyleDescriptor {
    StyleDescriptor::new("Vincent van Gogh", "post-impressionism", "The Starry Night")
}

async fn mount_submission(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/predictions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "abc",
            "status": "starting"
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_processing(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path("/predictions/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "processing" })))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, request_path: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == request_path)
        .collect()
}

fn assert_monotonic(events: &[ProgressEvent]) {
    assert!(
        events.windows(2).all(|w| w[0].percent <= w[1].percent),
        "progress went backwards: {:?}",
        events.iter().map(|e| e.percent).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_scenario_a_successful_transfer() {
    let server = MockServer::start().await;
    let storage = tempfile::tempdir().unwrap();
    let result_image = encode(64, 32, ImageFormat::Jpeg);
    let result_url = format!("{}/result.jpg", server.uri());

    mount_submission(&server).await;
    mount_processing(&server, 3).await;
    Mock::given(method("GET"))
        .and(path("/predictions/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "succeeded",
            "output": [result_url]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/result.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(result_image.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let transfer = StyleTransfer::new(&settings_for(&server, &storage)).unwrap();
    let photo = SourceImage::from_bytes(encode(2000, 1000, ImageFormat::Png));
    let (tx, mut rx) = progress::channel();

    let result = transfer.process(&photo, &van_gogh(), &tx).await;

    assert!(result.success);
    assert!(!result.is_mock);
    assert_eq!(result.remote_url.as_deref(), Some(result_url.as_str()));
    assert_eq!(result.image.as_deref(), Some(result_image.as_slice()));
    assert_eq!(result.fallback_reason, None);

    // Three processing polls plus the succeeded one
    assert_eq!(requests_to(&server, "/predictions/abc").await.len(), 4);

    // The submitted image was bounded to 768 px wide
    let submissions = requests_to(&server, "/predictions").await;
    let body: Value = serde_json::from_slice(&submissions[0].body).unwrap();
    let submitted = encoding::decode(body["image"].as_str().unwrap()).unwrap();
    let submitted = image::load_from_memory(&submitted).unwrap();
    assert_eq!((submitted.width(), submitted.height()), (768, 384));
    assert!(body["prompt"]
        .as_str()
        .unwrap()
        .contains("in the style of Vincent van Gogh"));

    // Result is stored locally and can be released
    let stored = result.file_path().cloned().expect("file handle");
    assert_eq!(std::fs::read(&stored).unwrap(), result_image);
    transfer.release(&result).await.unwrap();
    assert!(!stored.exists());

    let events = rx.drain();
    assert_monotonic(&events);
    let done = events.iter().position(|e| e.percent == 100).unwrap();
    assert_eq!(done, events.len() - 1);
    assert_eq!(events[done].stage, Stage::Done);
    assert!(events.iter().any(|e| e.stage == Stage::Submitting));
}

#[tokio::test]
async fn test_scenario_b_submission_error_falls_back() {
    let server = MockServer::start().await;
    let storage = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path("/predictions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;

    let transfer = StyleTransfer::new(&settings_for(&server, &storage)).unwrap();
    let photo = SourceImage::from_bytes(encode(320, 240, ImageFormat::Png));
    let (tx, mut rx) = progress::channel();

    let result = transfer.process(&photo, &van_gogh(), &tx).await;

    assert!(result.success);
    assert!(result.is_mock);
    assert_eq!(result.image.as_ref(), Some(&photo.data));
    assert_eq!(result.remote_url, None);
    assert!(matches!(result.handle, Some(ResultHandle::DataUrl(_))));
    assert!(result.fallback_reason.as_deref().unwrap().contains("500"));

    // No polling after a failed submission
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let events = rx.drain();
    assert!(events.iter().any(|e| e.stage == Stage::Simulating));
    assert_eq!(events.last().map(|e| e.stage), Some(Stage::Done));
}

#[tokio::test]
async fn test_scenario_c_failed_prediction_falls_back() {
    let server = MockServer::start().await;
    let storage = tempfile::tempdir().unwrap();

    mount_submission(&server).await;
    mount_processing(&server, 4).await;
    Mock::given(method("GET"))
        .and(path("/predictions/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "failed",
            "error": "CUDA out of memory"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/result.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
        .expect(0)
        .mount(&server)
        .await;

    let transfer = StyleTransfer::new(&settings_for(&server, &storage)).unwrap();
    let photo = SourceImage::from_bytes(encode(320, 240, ImageFormat::Png));

    let result = transfer
        .process(&photo, &van_gogh(), &progress::ProgressSender::disabled())
        .await;

    assert!(result.success);
    assert!(result.is_mock);
    assert_eq!(result.image.as_ref(), Some(&photo.data));
    assert_eq!(result.remote_url, None);
    assert!(result
        .fallback_reason
        .as_deref()
        .unwrap()
        .contains("CUDA out of memory"));

    // Failure observed on the fifth status check; polling stopped there
    assert_eq!(requests_to(&server, "/predictions/abc").await.len(), 5);
    assert!(std::fs::read_dir(storage.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_stuck_prediction_stops_at_budget() {
    let server = MockServer::start().await;
    let storage = tempfile::tempdir().unwrap();

    mount_submission(&server).await;
    mount_processing(&server, 1000).await;

    let mut settings = settings_for(&server, &storage);
    settings.polling.max_attempts = 6;
    let transfer = StyleTransfer::new(&settings).unwrap();
    let photo = SourceImage::from_bytes(encode(320, 240, ImageFormat::Png));
    let (tx, mut rx) = progress::channel();

    let result = transfer.process(&photo, &van_gogh(), &tx).await;

    assert!(result.success);
    assert!(result.is_mock);
    assert_eq!(requests_to(&server, "/predictions/abc").await.len(), 6);

    let events = rx.drain();
    let polling: Vec<&ProgressEvent> = events
        .iter()
        .filter(|e| e.stage == Stage::Processing)
        .collect();
    assert_eq!(polling.len(), 6);
    assert!(polling.iter().all(|e| e.percent < 100));
}

#[tokio::test]
async fn test_undecodable_photo_falls_back_without_network() {
    let server = MockServer::start().await;
    let storage = tempfile::tempdir().unwrap();

    let transfer = StyleTransfer::new(&settings_for(&server, &storage)).unwrap();
    let photo = SourceImage::new(b"this is not a photo".to_vec(), "image/jpeg");

    let result = transfer
        .process(&photo, &van_gogh(), &progress::ProgressSender::disabled())
        .await;

    assert!(result.success);
    assert!(result.is_mock);
    assert_eq!(result.image.as_ref(), Some(&photo.data));
    assert!(result
        .fallback_reason
        .as_deref()
        .unwrap()
        .contains("decode"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_single_output_and_service_status_url() {
    let server = MockServer::start().await;
    let storage = tempfile::tempdir().unwrap();
    let result_url = format!("{}/files/out.png", server.uri());

    Mock::given(method("POST"))
        .and(path("/predictions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "xyz",
            "status": "processing",
            "urls": { "get": format!("{}/v1/predictions/xyz", server.uri()) }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/predictions/xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "succeeded",
            "output": result_url
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/out.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(encode(16, 16, ImageFormat::Png)))
        .mount(&server)
        .await;

    let transfer = StyleTransfer::new(&settings_for(&server, &storage)).unwrap();
    let photo = SourceImage::from_bytes(encode(100, 100, ImageFormat::Png));

    let result = transfer
        .process(&photo, &van_gogh(), &progress::ProgressSender::disabled())
        .await;

    assert!(!result.is_mock);
    assert_eq!(result.remote_url.as_deref(), Some(result_url.as_str()));
    let stored = result.file_path().unwrap();
    assert_eq!(stored.extension().and_then(|e| e.to_str()), Some("png"));
}

#[tokio::test]
async fn test_independent_transfers_share_nothing() {
    let server = MockServer::start().await;
    let storage = tempfile::tempdir().unwrap();

    let transfer = Arc::new(StyleTransfer::new(&settings_for(&server, &storage)).unwrap());
    let first = SourceImage::new(b"first".to_vec(), "image/jpeg");
    let second = SourceImage::new(b"second".to_vec(), "image/png");
    let (tx_a, mut rx_a) = progress::channel();
    let (tx_b, mut rx_b) = progress::channel();

    let style = van_gogh();
    let (a, b) = tokio::join!(
        transfer.process(&first, &style, &tx_a),
        transfer.process(&second, &style, &tx_b)
    );

    assert_eq!(a.image.as_deref(), Some(&b"first"[..]));
    assert_eq!(b.image.as_deref(), Some(&b"second"[..]));
    assert_eq!(rx_a.drain().last().map(|e| e.stage), Some(Stage::Done));
    assert_eq!(rx_b.drain().last().map(|e| e.stage), Some(Stage::Done));
}

#[tokio::test]
async fn test_unusable_status_url_fails_without_retrying() {
    let server = MockServer::start().await;
    let storage = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path("/predictions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "abc",
            "status": "starting",
            "urls": { "get": "not a url/predictions/abc" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = settings_for(&server, &storage);
    settings.polling.max_attempts = 6;
    let transfer = StyleTransfer::new(&settings).unwrap();
    let photo = SourceImage::from_bytes(encode(320, 240, ImageFormat::Png));
    let (tx, mut rx) = progress::channel();

    let result = transfer.process(&photo, &van_gogh(), &tx).await;

    assert!(result.is_mock);
    let reason = result.fallback_reason.as_deref().unwrap();
    assert!(reason.starts_with("HTTP client error"), "{reason}");

    // The first status check gave up; nothing else was polled
    let events = rx.drain();
    assert!(events.iter().all(|e| e.stage != Stage::Processing && e.stage != Stage::Queued));
}
