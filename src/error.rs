//! Error handling for rpip.
//!
//! This module provides the [`Error`] enum returned by every fallible
//! operation of the download engine, and the copyable [`ErrorKind`]
//! classification carried by a [`DownloadOutcome`](crate::DownloadOutcome).
//!
//! The split exists because errors wrap non-cloneable sources
//! (`io::Error`, `reqwest::Error`) while outcomes must be cheap to store
//! and compare. [`Error::kind`] projects one onto the other, keeping the
//! numeric context (HTTP status, exit code, byte counts).

use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can happen while downloading or verifying an artifact.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from an underlying system.
    ///
    /// Failures that don't fit into other categories, such as a panicked
    /// verification thread.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The URL could not be parsed or does not name a file.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// An external download utility could not be found or launched.
    #[error("Downloader tool not found: {tool}")]
    ToolNotFound {
        /// Name of the executable.
        tool: String,
    },

    /// The server answered with a status the downloader cannot use.
    #[error("HTTP error {status}")]
    HttpError {
        /// HTTP status code.
        status: u16,
    },

    /// A recoverable network failure. Bytes already flushed to disk stay
    /// valid, so calling the downloader again resumes from there.
    #[error("Transient I/O error after {bytes_written} bytes: {message}")]
    TransientIo {
        /// Length of the destination file when the failure happened.
        bytes_written: u64,
        /// Description of the underlying failure.
        message: String,
    },

    /// The transfer ended before the announced total was reached, or the
    /// body overran the expected size of the target.
    #[error("Incomplete transfer: expected {expected} bytes, got {actual}")]
    IncompleteTransfer {
        /// Total size announced by the server or the target.
        expected: u64,
        /// Length of the destination file.
        actual: u64,
    },

    /// The downloaded file does not match the expected digest.
    #[error("Integrity mismatch ({algorithm}): expected {expected}, got {actual}")]
    IntegrityMismatch {
        /// Digest algorithm name.
        algorithm: String,
        /// Expected hex digest.
        expected: String,
        /// Computed hex digest.
        actual: String,
    },

    /// The expected hash is not of the form `<algorithm>=<hex>` or `<hex>`.
    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    /// The expected hash names an algorithm we cannot compute.
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// An external download utility exited unsuccessfully.
    #[error("{tool} exited with {}: {stderr}", display_exit_code(.exit_code))]
    SubprocessFailed {
        /// Name of the executable.
        tool: String,
        /// Exit code, `None` when the process was killed by a signal.
        exit_code: Option<i32>,
        /// Last lines written to stderr, if they were captured.
        stderr: String,
    },

    /// The caller-supplied deadline elapsed.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Another download to the same destination is in flight.
    #[error("Destination is already being downloaded: {0}")]
    DestinationBusy(String),

    /// I/O Error.
    ///
    /// Local filesystem failures: opening, writing or reading the
    /// destination file.
    #[error("I/O error")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    #[error("Reqwest Error")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error from the HTTP middleware stack.
    #[error("HTTP middleware error")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },
}

fn display_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

fn classify_reqwest(e: &reqwest::Error) -> ErrorKind {
    if e.is_builder() {
        return ErrorKind::InvalidUrl;
    }
    match e.status() {
        Some(status) => ErrorKind::HttpError {
            status: status.as_u16(),
        },
        None => ErrorKind::TransientIo { bytes_written: 0 },
    }
}

/// Result type alias for operations that can fail with an rpip error.
pub type Result<T> = std::result::Result<T, Error>;

/// Copyable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidUrl,
    ToolNotFound,
    HttpError { status: u16 },
    TransientIo { bytes_written: u64 },
    IncompleteTransfer { expected: u64, actual: u64 },
    IntegrityMismatch,
    InvalidHash,
    UnsupportedAlgorithm,
    SubprocessFailed { exit_code: Option<i32> },
    Timeout,
    DestinationBusy,
    Io,
    Internal,
}

impl ErrorKind {
    /// Whether the orchestrator may retry the download immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::TransientIo { .. })
    }

    /// What a user can do about this failure.
    pub fn hint(&self) -> &'static str {
        match self {
            ErrorKind::IncompleteTransfer { expected, actual } if actual > expected => {
                "The server sent more than the expected size; check the expected size."
            }
            ErrorKind::TransientIo { .. }
            | ErrorKind::Timeout
            | ErrorKind::IncompleteTransfer { .. }
            | ErrorKind::SubprocessFailed { .. } => {
                "Run the same command again to resume the download."
            }
            ErrorKind::IntegrityMismatch => "Delete the downloaded file and retry.",
            ErrorKind::HttpError { status } if *status >= 500 => {
                "The server is failing; retry later to resume the download."
            }
            ErrorKind::HttpError { .. } => "Check that the URL is correct and reachable.",
            ErrorKind::ToolNotFound => "Install the tool or choose another downloader.",
            ErrorKind::UnsupportedAlgorithm | ErrorKind::InvalidHash => {
                "Provide a sha256, sha512 or md5 digest."
            }
            ErrorKind::DestinationBusy => "Wait for the other download to finish.",
            ErrorKind::InvalidUrl => "Check the URL.",
            ErrorKind::Io => "Check the destination path and free disk space.",
            ErrorKind::Internal => "Retry; if it persists, report a bug.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidUrl => write!(f, "invalid URL"),
            ErrorKind::ToolNotFound => write!(f, "tool not found"),
            ErrorKind::HttpError { status } => write!(f, "HTTP error {}", status),
            ErrorKind::TransientIo { bytes_written } => {
                write!(f, "transient I/O error at byte {}", bytes_written)
            }
            ErrorKind::IncompleteTransfer { expected, actual } => {
                write!(f, "incomplete transfer ({}/{} bytes)", actual, expected)
            }
            ErrorKind::IntegrityMismatch => write!(f, "integrity mismatch"),
            ErrorKind::InvalidHash => write!(f, "invalid hash"),
            ErrorKind::UnsupportedAlgorithm => write!(f, "unsupported hash algorithm"),
            ErrorKind::SubprocessFailed { exit_code } => {
                write!(f, "subprocess failed with {}", display_exit_code(exit_code))
            }
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::DestinationBusy => write!(f, "destination busy"),
            ErrorKind::Io => write!(f, "I/O error"),
            ErrorKind::Internal => write!(f, "internal error"),
        }
    }
}

impl Error {
    /// Classify this error.
    ///
    /// Network-level failures surfaced by `reqwest` (connect errors,
    /// timeouts, broken bodies) are transient; everything coming from the
    /// local filesystem is not.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Error::ToolNotFound { .. } => ErrorKind::ToolNotFound,
            Error::HttpError { status } => ErrorKind::HttpError { status: *status },
            Error::TransientIo { bytes_written, .. } => ErrorKind::TransientIo {
                bytes_written: *bytes_written,
            },
            Error::IncompleteTransfer { expected, actual } => ErrorKind::IncompleteTransfer {
                expected: *expected,
                actual: *actual,
            },
            Error::IntegrityMismatch { .. } => ErrorKind::IntegrityMismatch,
            Error::InvalidHash(_) => ErrorKind::InvalidHash,
            Error::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
            Error::SubprocessFailed { exit_code, .. } => ErrorKind::SubprocessFailed {
                exit_code: *exit_code,
            },
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::DestinationBusy(_) => ErrorKind::DestinationBusy,
            Error::IOError { .. } => ErrorKind::Io,
            Error::Reqwest { source } => classify_reqwest(source),
            Error::Middleware { source } => match source {
                reqwest_middleware::Error::Reqwest(e) => classify_reqwest(e),
                reqwest_middleware::Error::Middleware(_) => {
                    ErrorKind::TransientIo { bytes_written: 0 }
                }
            },
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Human-readable message including the source chain.
    pub fn detailed_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}
