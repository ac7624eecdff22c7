//! Download module containing the data handed in and out of the engine.
//!
//! # Overview
//!
//! - [`target`] - The [`DownloadTarget`] supplied by the package resolver
//! - [`hash`] - Streaming digest verification through [`HashVerifier`]
//! - [`outcome`] - The [`DownloadOutcome`] handed to the installer step
//!
//! # Examples
//!
//! ```rust
//! use rpip::download::{DownloadTarget, ExpectedHash};
//! use std::convert::TryFrom;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let target = DownloadTarget::try_from("https://example.test/pkg-1.0.whl")?
//!     .with_expected_size(Some(4096))
//!     .with_expected_hash(Some("sha256=0123abcd".parse::<ExpectedHash>()?));
//! # Ok(())
//! # }
//! ```

pub mod hash;
pub mod outcome;
pub mod target;

pub use hash::{
    detect_algorithm, verify_hash, ExpectedHash, HashAlgorithm, HashVerifier, VerificationResult,
};
pub use outcome::{DownloadOutcome, Failure};
pub use target::DownloadTarget;
