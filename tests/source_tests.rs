//! Text sources: single GET and local file.

mod common;

use std::io::Write;
use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use readaloud::engine::RecordingEngine;
use readaloud::error::{ErrorCategory, NarrationError, RecoverySuggestion};
use readaloud::playback::PlaybackController;
use readaloud::source::{load_into, FileTextSource, HttpTextSource, TextSource};

#[tokio::test]
async fn http_source_fetches_body_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sample.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("今日のニュースです。"))
        .expect(1)
        .mount(&server)
        .await;

    let source = HttpTextSource::new(format!("{}/sample.txt", server.uri()));
    let engine = Arc::new(RecordingEngine::new());
    let mut controller = PlaybackController::new(engine);

    load_into(&source, &mut controller).await.unwrap();

    assert_eq!(controller.text(), Some("今日のニュースです。"));
    assert_eq!(controller.snapshot().text_len, 10);
    assert!(controller.snapshot().has_text);
}

#[tokio::test]
async fn http_error_status_leaves_controls_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sample.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = HttpTextSource::new(format!("{}/sample.txt", server.uri()));
    let mut controller = PlaybackController::new(Arc::new(RecordingEngine::new()));

    let err = load_into(&source, &mut controller).await.unwrap_err();

    assert!(matches!(err, NarrationError::TextUnavailable(ref m) if m.contains("404")));
    assert_eq!(err.recovery_suggestion(), RecoverySuggestion::KeepControlsDisabled);
    assert!(!controller.snapshot().has_text);
    assert!(matches!(
        controller.play(),
        Err(NarrationError::TextUnavailable(_))
    ));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let source = HttpTextSource::new("http://127.0.0.1:9/sample.txt");
    let err = source.fetch().await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Network);
}

#[tokio::test]
async fn file_source_reads_text() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", common::HELLO).unwrap();

    let source = FileTextSource::new(file.path());
    assert_eq!(source.fetch().await.unwrap(), common::HELLO);
    assert_eq!(source.describe(), file.path().display().to_string());
}

#[tokio::test]
async fn missing_file_is_text_unavailable() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = FileTextSource::new(dir.path().join("missing.txt"));

    let err = source.fetch().await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TextSource);
}
