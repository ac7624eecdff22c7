//! Download outcome reporting.
//!
//! This module contains the [`DownloadOutcome`] struct handed to the
//! installer step once a target reaches a terminal state, and the
//! [`Failure`] detail carried by failed outcomes.
//!
//! # Examples
//!
//! ```rust
//! use rpip::download::{DownloadOutcome, DownloadTarget};
//! use rpip::strategy::DownloaderStrategy;
//! use rpip::Error;
//! use std::convert::TryFrom;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let target = DownloadTarget::try_from("https://example.test/pkg-1.0.whl")?;
//! let outcome = DownloadOutcome::failed(
//!     &target,
//!     Some(DownloaderStrategy::Native),
//!     &Error::HttpError { status: 404 },
//!     0,
//!     1,
//! );
//!
//! if let Some(failure) = outcome.error() {
//!     println!("{} ({})", failure.message, failure.hint());
//! }
//! # Ok(())
//! # }
//! ```

use super::hash::VerificationResult;
use super::target::DownloadTarget;
use crate::error::{Error, ErrorKind};
use crate::strategy::DownloaderStrategy;

use std::fmt;
use std::path::{Path, PathBuf};

/// Why a download failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Classification, with its numeric context.
    pub kind: ErrorKind,
    /// Full error message.
    pub message: String,
}

impl Failure {
    pub fn from_error(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.detailed_message(),
        }
    }

    /// What the user can do about it.
    pub fn hint(&self) -> &'static str {
        self.kind.hint()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Represents the terminal state of one [`DownloadTarget`].
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    /// Where the artifact is (or would have been) stored.
    final_path: PathBuf,
    /// URL the artifact was fetched from.
    url: String,
    /// Set when the run ended in failure.
    error: Option<Failure>,
    /// Bytes of the artifact present at the destination when the run ended.
    bytes_transferred: u64,
    /// Strategy that ran, `None` if the run failed before selection.
    strategy_used: Option<DownloaderStrategy>,
    /// Verification pass, if one was reached.
    verification: Option<VerificationResult>,
    /// Number of download attempts made.
    attempts: u32,
}

impl DownloadOutcome {
    /// Create a successful outcome.
    pub fn succeeded(
        target: &DownloadTarget,
        strategy_used: DownloaderStrategy,
        bytes_transferred: u64,
        attempts: u32,
        verification: VerificationResult,
    ) -> Self {
        Self {
            final_path: target.destination().to_path_buf(),
            url: target.url().to_string(),
            error: None,
            bytes_transferred,
            strategy_used: Some(strategy_used),
            verification: Some(verification),
            attempts,
        }
    }

    /// Create a failed outcome from the error that ended the run.
    pub fn failed(
        target: &DownloadTarget,
        strategy_used: Option<DownloaderStrategy>,
        error: &Error,
        bytes_transferred: u64,
        attempts: u32,
    ) -> Self {
        Self {
            final_path: target.destination().to_path_buf(),
            url: target.url().to_string(),
            error: Some(Failure::from_error(error)),
            bytes_transferred,
            strategy_used,
            verification: None,
            attempts,
        }
    }

    /// Attach the verification pass that ended the run.
    pub fn with_verification(self, verification: VerificationResult) -> Self {
        Self {
            verification: Some(verification),
            ..self
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn error(&self) -> Option<&Failure> {
        self.error.as_ref()
    }

    /// Kind of the failure, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|f| f.kind)
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    pub fn strategy_used(&self) -> Option<DownloaderStrategy> {
        self.strategy_used
    }

    pub fn verification(&self) -> Option<&VerificationResult> {
        self.verification.as_ref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// `true` only if the artifact was downloaded and its digest checked.
    #[must_use]
    pub fn is_integrity_verified(&self) -> bool {
        self.success() && self.verification.as_ref().is_some_and(|v| v.is_verified())
    }
}
