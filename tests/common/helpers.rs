#![allow(dead_code)]

use rpip::download::DownloadTarget;
use rpip::downloader::{DownloadOrchestrator, OrchestratorBuilder};
use rpip::strategy::DownloaderStrategy;
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

// Common test constants
pub const TEST_FILENAME: &str = "pkg-1.0-py3-none-any.whl";
pub const TEST_USER_AGENT: &str = "rpip-test-agent";

/// Creates a temporary directory for testing purposes
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Creates a temporary file with the given content
pub fn create_temp_file(dir: &Path, filename: &str, content: &[u8]) -> PathBuf {
    let file_path = dir.join(filename);
    fs::write(&file_path, content).expect("Failed to write temporary file");
    file_path
}

/// Creates test file content of specified size
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Lowercase hex SHA-256 of `content`
pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Asserts that a file has the expected size
pub fn assert_file_size(path: &Path, expected_size: u64) {
    let metadata = fs::metadata(path).expect("Failed to get file metadata");
    assert_eq!(
        metadata.len(),
        expected_size,
        "File size mismatch at path: {:?}",
        path
    );
}

/// Asserts that a file holds exactly `content`
pub fn assert_file_content(path: &Path, content: &[u8]) {
    let on_disk = fs::read(path).expect("Failed to read file");
    assert!(on_disk == content, "File content mismatch at path: {:?}", path);
}

// === Target Helpers ===

/// URL of `TEST_FILENAME` on the mock server
pub fn artifact_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/{}", server.uri(), TEST_FILENAME)).expect("Invalid mock URL")
}

/// Target for `TEST_FILENAME` on the mock server, saved in `dir`
pub fn create_test_target(server: &MockServer, dir: &Path) -> DownloadTarget {
    DownloadTarget::new(&artifact_url(server), dir.join(TEST_FILENAME))
}

// === Orchestrator Helpers ===

/// Orchestrator forced onto the native downloader, without request-level
/// retries so failures surface immediately.
pub fn create_native_builder() -> OrchestratorBuilder {
    OrchestratorBuilder::new()
        .strategy(DownloaderStrategy::Native)
        .http_retries(0)
        .interactive(false)
        .read_timeout(Duration::from_secs(5))
        .chunk_size(1024)
}

pub fn create_native_orchestrator() -> DownloadOrchestrator {
    create_native_builder().build()
}

// === Mock Server Helpers ===

/// Serves `body`, honouring `Range: bytes=<start>-` like a well-behaved
/// static file server.
pub struct RangeResponder {
    pub body: Vec<u8>,
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let total = self.body.len();
        let start = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("bytes="))
            .and_then(|v| v.strip_suffix('-'))
            .and_then(|v| v.parse::<usize>().ok());

        match start {
            Some(start) if start >= total => ResponseTemplate::new(416)
                .insert_header("Content-Range", format!("bytes */{}", total).as_str()),
            Some(start) => ResponseTemplate::new(206)
                .insert_header(
                    "Content-Range",
                    format!("bytes {}-{}/{}", start, total - 1, total).as_str(),
                )
                .set_body_bytes(self.body[start..].to_vec()),
            None => ResponseTemplate::new(200).set_body_bytes(self.body.clone()),
        }
    }
}

// === Raw Server Helpers ===

/// HTTP/1.1 server that serves `body` with range support, except that the
/// first `cut_responses` GETs announce the full length and then hang up
/// after `cut` bytes.
pub struct InterruptingServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl InterruptingServer {
    pub async fn start(body: Vec<u8>, cut: usize, cut_responses: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Test server has no address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();

        tokio::spawn(async move {
            let mut cuts_left = cut_responses;
            while let Ok((mut socket, _)) = listener.accept().await {
                let head = read_request_head(&mut socket).await;
                log.lock().unwrap().push(head.clone());

                let is_get = head.starts_with("get ");
                let truncate = is_get && cuts_left > 0;
                if truncate {
                    cuts_left -= 1;
                }
                let response = respond(&head, &body, truncate.then_some(cut));
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/{}", self.addr, TEST_FILENAME)).expect("Invalid test URL")
    }

    /// Lowercased heads of the GET requests received so far.
    pub fn gets(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|head| head.starts_with("get "))
            .cloned()
            .collect()
    }
}

async fn read_request_head(socket: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).to_lowercase()
}

fn range_start(head: &str) -> Option<usize> {
    head.lines()
        .find_map(|line| line.strip_prefix("range: bytes="))
        .and_then(|v| v.trim().strip_suffix('-'))
        .and_then(|v| v.parse().ok())
}

fn respond(head: &str, body: &[u8], cut: Option<usize>) -> Vec<u8> {
    let total = body.len();
    if head.starts_with("head ") {
        return format!(
            "HTTP/1.1 200 OK\r\nAccept-Ranges: bytes\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            total
        )
        .into_bytes();
    }

    let start = range_start(head).filter(|&start| start < total).unwrap_or(0);
    let status = if start > 0 {
        format!(
            "206 Partial Content\r\nContent-Range: bytes {}-{}/{}",
            start,
            total - 1,
            total
        )
    } else {
        "200 OK".to_string()
    };
    let rest = &body[start..];
    let sent = match cut {
        Some(cut) => &rest[..cut.min(rest.len())],
        None => rest,
    };

    let mut response = format!(
        "HTTP/1.1 {}\r\nAccept-Ranges: bytes\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        rest.len()
    )
    .into_bytes();
    response.extend_from_slice(sent);
    response
}
