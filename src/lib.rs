//! rpip downloads large package artifacts over HTTP(S) in a way that
//! survives interruptions: a partial file is continued from its current
//! length with a range request, and the result is checked against an
//! expected digest.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rpip::{download::DownloadTarget, downloader::OrchestratorBuilder, Error};
//! use std::convert::TryFrom;
//! use std::path::PathBuf;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let wheel = "https://example.test/packages/torch-2.3.0-cp311-linux_x86_64.whl";
//! let targets = vec![DownloadTarget::try_from(wheel)?
//!     .with_expected_size(Some(779_147_266))];
//! let orchestrator = OrchestratorBuilder::new()
//!     .directory(PathBuf::from("output"))
//!     .build();
//! orchestrator.run_all(&targets).await;
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`download`] - Targets, outcomes and hash verification
//! - [`downloader`] - The [`DownloadOrchestrator`] and its builder
//! - [`strategy`] - External tools and the native range-resuming downloader
//! - [`error`] - Centralized error handling with the `Error` enum
//! - [`http`] - HTTP client and range probing
//! - [`progress`] - Progress events and their terminal display
//! - [`utils`] - Header parsing helpers

pub mod download;
pub mod downloader;
pub mod error;
pub mod http;
pub mod progress;
pub mod strategy;
pub mod utils;

pub use download::{
    verify_hash, DownloadOutcome, DownloadTarget, ExpectedHash, HashAlgorithm, HashVerifier,
    VerificationResult,
};
pub use downloader::{DownloadOrchestrator, OrchestratorBuilder};
pub use error::{Error, ErrorKind, Result};
pub use http::{create_http_client, HttpClientConfig};
pub use progress::{ProgressBarOpts, ProgressCallback, ProgressEvent, StyleOptions};
pub use strategy::{DownloaderSelector, DownloaderStrategy, Fetcher, NativeDownloader};
