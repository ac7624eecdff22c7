//! End-to-end tests of the native downloader against a mock HTTP server.
//!
//! Covers range resume, servers that ignore or reject ranges, terminal
//! HTTP errors, and verification of the finished file.

use rpip::download::{DownloadTarget, ExpectedHash};
use rpip::progress::ProgressEvent;
use rpip::strategy::{DownloaderStrategy, NativeDownloader};
use rpip::{create_http_client, ErrorKind, HttpClientConfig};

use reqwest::header::{HeaderValue, USER_AGENT};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::helpers::*;

fn sha256_of(content: &[u8]) -> Option<ExpectedHash> {
    Some(ExpectedHash::new("sha256", sha256_hex(content)))
}

#[tokio::test]
async fn test_resume_from_partial_file() {
    let server = MockServer::start().await;
    let content = create_test_content(4096);
    Mock::given(method("GET"))
        .and(path(format!("/{}", TEST_FILENAME)))
        .and(header("Range", "bytes=1024-"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Range", "bytes 1024-4095/4096")
                .set_body_bytes(content[1024..].to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = create_temp_dir();
    create_temp_file(temp_dir.path(), TEST_FILENAME, &content[..1024]);
    let target = create_test_target(&server, temp_dir.path())
        .with_expected_size(Some(4096))
        .with_expected_hash(sha256_of(&content));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let orchestrator = create_native_builder()
        .on_progress(move |event: &ProgressEvent| {
            sink.lock().unwrap().push(event.bytes_downloaded);
        })
        .build();

    let outcome = orchestrator.run(&target).await;

    assert!(outcome.success(), "{:?}", outcome.error());
    assert!(outcome.is_integrity_verified());
    assert_eq!(outcome.bytes_transferred(), 4096);
    assert_eq!(outcome.strategy_used(), Some(DownloaderStrategy::Native));
    assert_eq!(outcome.attempts(), 1);
    assert_file_content(target.destination(), &content);
    assert_eq!(*seen.lock().unwrap(), vec![2048, 3072, 4096]);
}

#[tokio::test]
async fn test_ignored_range_restarts_from_zero() {
    let server = MockServer::start().await;
    let content = create_test_content(4096);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .mount(&server)
        .await;

    let temp_dir = create_temp_dir();
    create_temp_file(temp_dir.path(), TEST_FILENAME, &[0xAA; 1024]);
    let target =
        create_test_target(&server, temp_dir.path()).with_expected_hash(sha256_of(&content));

    let outcome = create_native_orchestrator().run(&target).await;

    assert!(outcome.success(), "{:?}", outcome.error());
    assert!(outcome.is_integrity_verified());
    assert_file_size(target.destination(), 4096);
}

#[tokio::test]
async fn test_unsatisfiable_range_at_total_is_complete() {
    let server = MockServer::start().await;
    let content = create_test_content(4096);
    Mock::given(method("GET"))
        .and(header("Range", "bytes=4096-"))
        .respond_with(ResponseTemplate::new(416).insert_header("Content-Range", "bytes */4096"))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = create_temp_dir();
    create_temp_file(temp_dir.path(), TEST_FILENAME, &content);
    let target =
        create_test_target(&server, temp_dir.path()).with_expected_hash(sha256_of(&content));

    let outcome = create_native_orchestrator().run(&target).await;

    assert!(outcome.success(), "{:?}", outcome.error());
    assert!(outcome.is_integrity_verified());
    assert_file_content(target.destination(), &content);
}

#[tokio::test]
async fn test_unsatisfiable_range_otherwise_restarts() {
    let server = MockServer::start().await;
    let content = create_test_content(4096);
    Mock::given(method("GET"))
        .and(header("Range", "bytes=100-"))
        .respond_with(ResponseTemplate::new(416))
        .expect(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .with_priority(10)
        .mount(&server)
        .await;

    let temp_dir = create_temp_dir();
    create_temp_file(temp_dir.path(), TEST_FILENAME, &[0x55; 100]);
    let target =
        create_test_target(&server, temp_dir.path()).with_expected_hash(sha256_of(&content));

    let outcome = create_native_orchestrator().run(&target).await;

    assert!(outcome.success(), "{:?}", outcome.error());
    assert_file_content(target.destination(), &content);
}

#[tokio::test]
async fn test_any_interrupted_prefix_resumes() {
    let server = MockServer::start().await;
    let content = create_test_content(5000);
    Mock::given(method("GET"))
        .respond_with(RangeResponder {
            body: content.clone(),
        })
        .mount(&server)
        .await;

    let orchestrator = create_native_orchestrator();
    for prefix in [0usize, 1, 1023, 1024, 2500, 4999, 5000] {
        let temp_dir = create_temp_dir();
        if prefix > 0 {
            create_temp_file(temp_dir.path(), TEST_FILENAME, &content[..prefix]);
        }
        let target =
            create_test_target(&server, temp_dir.path()).with_expected_hash(sha256_of(&content));

        let outcome = orchestrator.run(&target).await;

        assert!(outcome.success(), "prefix {}: {:?}", prefix, outcome.error());
        assert!(outcome.is_integrity_verified(), "prefix {}", prefix);
        assert_file_content(target.destination(), &content);
    }
}

#[tokio::test]
async fn test_connection_dropped_mid_body_is_transient() {
    let content = create_test_content(4096);
    let server = InterruptingServer::start(content.clone(), 1500, 1).await;
    let temp_dir = create_temp_dir();
    let target = DownloadTarget::new(&server.url(), temp_dir.path().join(TEST_FILENAME));
    let client = create_http_client(HttpClientConfig {
        retries: 0,
        ..HttpClientConfig::default()
    })
    .unwrap();

    let err = NativeDownloader::new(client)
        .with_chunk_size(1024)
        .download(&target, None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransientIo { bytes_written: 1500 });
    assert!(err.kind().is_retryable());
    assert_file_content(target.destination(), &content[..1500]);
}

#[tokio::test]
async fn test_retry_after_dropped_connection_resumes() {
    let content = create_test_content(4096);
    let server = InterruptingServer::start(content.clone(), 1500, 1).await;
    let temp_dir = create_temp_dir();
    let target = DownloadTarget::new(&server.url(), temp_dir.path().join(TEST_FILENAME))
        .with_expected_hash(sha256_of(&content));

    let outcome = create_native_orchestrator().run(&target).await;

    assert!(outcome.success(), "{:?}", outcome.error());
    assert!(outcome.is_integrity_verified());
    assert_eq!(outcome.attempts(), 2);
    let gets = server.gets();
    assert_eq!(gets.len(), 2);
    assert!(!gets[0].contains("range:"));
    assert!(gets[1].contains("range: bytes=1500-"), "{}", gets[1]);
    assert_file_content(target.destination(), &content);
}

#[tokio::test]
async fn test_http_not_found_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = create_temp_dir();
    let target = create_test_target(&server, temp_dir.path());

    let outcome = create_native_orchestrator().run(&target).await;

    assert!(!outcome.success());
    assert_eq!(outcome.error_kind(), Some(ErrorKind::HttpError { status: 404 }));
    assert_eq!(outcome.attempts(), 1);
    assert!(!outcome.error().unwrap().hint().is_empty());
}

#[tokio::test]
async fn test_server_refusing_ranges_gets_full_request() {
    let server = MockServer::start().await;
    let content = create_test_content(2048);
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("Accept-Ranges", "none"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header_exists("Range"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .with_priority(10)
        .mount(&server)
        .await;

    let temp_dir = create_temp_dir();
    create_temp_file(temp_dir.path(), TEST_FILENAME, &content[..512]);
    let target = create_test_target(&server, temp_dir.path());

    let outcome = create_native_orchestrator().run(&target).await;

    assert!(outcome.success(), "{:?}", outcome.error());
    assert_file_content(target.destination(), &content);
}

#[tokio::test]
async fn test_short_body_keeps_partial_file() {
    let server = MockServer::start().await;
    let content = create_test_content(4096);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content[..2048].to_vec()))
        .mount(&server)
        .await;

    let temp_dir = create_temp_dir();
    let target = create_test_target(&server, temp_dir.path()).with_expected_size(Some(4096));

    let outcome = create_native_orchestrator().run(&target).await;

    assert_eq!(
        outcome.error_kind(),
        Some(ErrorKind::IncompleteTransfer {
            expected: 4096,
            actual: 2048
        })
    );
    assert_eq!(outcome.bytes_transferred(), 2048);
    assert_file_size(target.destination(), 2048);
}

#[tokio::test]
async fn test_hash_mismatch_leaves_file_for_inspection() {
    let server = MockServer::start().await;
    let content = create_test_content(1500);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .mount(&server)
        .await;

    let temp_dir = create_temp_dir();
    let target = create_test_target(&server, temp_dir.path())
        .with_expected_hash(sha256_of(b"something else"));

    let outcome = create_native_orchestrator().run(&target).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::IntegrityMismatch));
    let verification = outcome.verification().unwrap();
    assert!(!verification.matched);
    assert_eq!(verification.actual.as_deref(), Some(sha256_hex(&content).as_str()));
    assert_file_content(target.destination(), &content);
}

#[tokio::test]
async fn test_complete_by_size_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = create_temp_dir();
    create_temp_file(temp_dir.path(), TEST_FILENAME, &create_test_content(300));
    let target = create_test_target(&server, temp_dir.path()).with_expected_size(Some(300));

    let outcome = create_native_orchestrator().run(&target).await;

    assert!(outcome.success());
    assert_eq!(outcome.attempts(), 0);
    let verification = outcome.verification().unwrap();
    assert!(verification.skipped);
    assert!(!outcome.is_integrity_verified());
}

#[tokio::test]
async fn test_custom_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", TEST_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = create_temp_dir();
    let target = create_test_target(&server, temp_dir.path());
    let orchestrator = create_native_builder()
        .header(USER_AGENT, HeaderValue::from_static(TEST_USER_AGENT))
        .build();

    let outcome = orchestrator.run(&target).await;

    assert!(outcome.success(), "{:?}", outcome.error());
    assert_file_size(target.destination(), 2);
}
