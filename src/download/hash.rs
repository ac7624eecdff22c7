//! Integrity verification for downloaded artifacts.
//!
//! This module computes file digests in a streaming fashion and compares
//! them against the digest announced by the package resolver.
//!
//! # Supported Algorithms
//!
//! - **SHA-256**: the default, and what package indexes publish
//! - **SHA-512**
//! - **MD5**: accepted for legacy indexes only
//!
//! # Examples
//!
//! ## Parsing an expected hash
//!
//! ```rust
//! use rpip::download::hash::{ExpectedHash, HashAlgorithm};
//!
//! let hash: ExpectedHash = "sha256=e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
//!     .parse()
//!     .unwrap();
//! assert_eq!(hash.algorithm(), "sha256");
//! assert_eq!(hash.supported_algorithm().unwrap(), HashAlgorithm::Sha256);
//! ```
//!
//! ## File Verification
//!
//! ```rust,no_run
//! use rpip::download::hash::HashVerifier;
//! use std::path::Path;
//!
//! let result = HashVerifier::default()
//!     .verify(Path::new("pkg-1.0.whl"), "sha256", Some("e3b0c442..."))
//!     .unwrap();
//! if result.is_verified() {
//!     println!("integrity verified");
//! }
//! ```

use crate::error::{Error, ErrorKind, Result};

use md5::Md5;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Buffer size for reading files during digest computation (64 KiB).
pub const BUFFER_SIZE: usize = 64 * 1024;

/// Digest algorithms the verifier can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    /// Legacy only.
    Md5,
}

impl HashAlgorithm {
    /// Canonical lowercase name, as used in `"<algorithm>=<hex>"`.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Md5 => "md5",
        }
    }

    /// Length of a hex digest produced by this algorithm.
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha512 => 128,
            HashAlgorithm::Md5 => 32,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "md5" => Ok(HashAlgorithm::Md5),
            _ => Err(Error::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Detect the algorithm of a bare hex digest from its length.
///
/// Anything that is not a 128 or 32 character hex string is assumed to be
/// SHA-256, which is what package indexes publish.
///
/// ```
/// use rpip::download::hash::{detect_algorithm, HashAlgorithm};
///
/// assert_eq!(detect_algorithm("d41d8cd98f00b204e9800998ecf8427e"), HashAlgorithm::Md5);
/// assert_eq!(detect_algorithm("abc"), HashAlgorithm::Sha256);
/// ```
pub fn detect_algorithm(hex_digest: &str) -> HashAlgorithm {
    let is_hex = hex_digest.chars().all(|c| c.is_ascii_hexdigit());
    match hex_digest.len() {
        128 if is_hex => HashAlgorithm::Sha512,
        32 if is_hex => HashAlgorithm::Md5,
        _ => HashAlgorithm::Sha256,
    }
}

/// A digest an artifact must match: `(algorithm, hex_digest)`.
///
/// The algorithm is kept as the resolver spelled it so an unsupported one
/// surfaces at verification time instead of being dropped silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedHash {
    algorithm: String,
    hex_digest: String,
}

impl ExpectedHash {
    pub fn new(algorithm: impl Into<String>, hex_digest: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into().trim().to_ascii_lowercase(),
            hex_digest: hex_digest.into().trim().to_ascii_lowercase(),
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn hex_digest(&self) -> &str {
        &self.hex_digest
    }

    /// The algorithm, if the verifier can compute it.
    pub fn supported_algorithm(&self) -> Result<HashAlgorithm> {
        self.algorithm.parse()
    }
}

impl FromStr for ExpectedHash {
    type Err = Error;

    /// Parse `"<algorithm>=<hex>"`, or a bare hex digest.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (algorithm, hex_digest) = match s.split_once('=') {
            Some((algorithm, hex_digest)) => (algorithm.to_string(), hex_digest),
            None => (detect_algorithm(s).name().to_string(), s),
        };
        if hex_digest.is_empty() || !hex_digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidHash(s.to_string()));
        }
        Ok(ExpectedHash::new(algorithm, hex_digest))
    }
}

impl fmt::Display for ExpectedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.algorithm, self.hex_digest)
    }
}

/// Result of a verification pass.
///
/// `skipped` distinguishes "not checked" from "verified-ok": both report
/// `matched == true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    /// Algorithm requested by the caller.
    pub algorithm: String,
    /// Expected hex digest, `None` when verification was skipped.
    pub expected: Option<String>,
    /// Computed hex digest, `None` when nothing was computed.
    pub actual: Option<String>,
    /// Whether the file is considered intact.
    pub matched: bool,
    /// Whether no digest was available to check against.
    pub skipped: bool,
    /// Set when verification could not be carried out.
    pub error: Option<ErrorKind>,
}

impl VerificationResult {
    /// A result for a file that had no expected digest.
    pub fn skipped(algorithm: &str) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            expected: None,
            actual: None,
            matched: true,
            skipped: true,
            error: None,
        }
    }

    /// `true` only if a digest was computed and it matched.
    pub fn is_verified(&self) -> bool {
        self.matched && !self.skipped
    }
}

/// Streaming file digest verifier.
#[derive(Debug, Clone)]
pub struct HashVerifier {
    buffer_size: usize,
}

impl Default for HashVerifier {
    fn default() -> Self {
        Self {
            buffer_size: BUFFER_SIZE,
        }
    }
}

impl HashVerifier {
    /// Creates a verifier reading files `buffer_size` bytes at a time.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    /// Verify the file at `path` against `expected_hex`.
    ///
    /// Returns `Err` only when the file cannot be read. An unsupported
    /// algorithm yields `matched == false` with
    /// [`ErrorKind::UnsupportedAlgorithm`]; a missing `expected_hex`
    /// yields a skipped result.
    pub fn verify(
        &self,
        path: &Path,
        algorithm: &str,
        expected_hex: Option<&str>,
    ) -> Result<VerificationResult> {
        let Some(expected_hex) = expected_hex else {
            return Ok(VerificationResult::skipped(algorithm));
        };
        let expected = expected_hex.trim().to_ascii_lowercase();

        let hash_algorithm = match algorithm.parse::<HashAlgorithm>() {
            Ok(a) => a,
            Err(_) => {
                return Ok(VerificationResult {
                    algorithm: algorithm.to_string(),
                    expected: Some(expected),
                    actual: None,
                    matched: false,
                    skipped: false,
                    error: Some(ErrorKind::UnsupportedAlgorithm),
                })
            }
        };

        let actual = self.digest_file(path, hash_algorithm)?;
        let matched = actual == expected;

        Ok(VerificationResult {
            algorithm: hash_algorithm.name().to_string(),
            expected: Some(expected),
            actual: Some(actual),
            matched,
            skipped: false,
            error: (!matched).then_some(ErrorKind::IntegrityMismatch),
        })
    }

    /// Verify against an optional [`ExpectedHash`].
    pub fn verify_expected(
        &self,
        path: &Path,
        expected: Option<&ExpectedHash>,
    ) -> Result<VerificationResult> {
        match expected {
            Some(hash) => self.verify(path, hash.algorithm(), Some(hash.hex_digest())),
            None => Ok(VerificationResult::skipped(HashAlgorithm::Sha256.name())),
        }
    }

    /// Compute the lowercase hex digest of the file at `path`.
    pub fn digest_file(&self, path: &Path, algorithm: HashAlgorithm) -> Result<String> {
        let file = File::open(path)?;
        match algorithm {
            HashAlgorithm::Sha256 => self.digest_reader::<Sha256>(file),
            HashAlgorithm::Sha512 => self.digest_reader::<Sha512>(file),
            HashAlgorithm::Md5 => self.digest_reader::<Md5>(file),
        }
    }

    fn digest_reader<D: Digest>(&self, mut reader: impl Read) -> Result<String> {
        let mut hasher = D::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }
}

/// Verify a file with the default [`HashVerifier`].
pub fn verify_hash(path: &Path, expected: Option<&ExpectedHash>) -> Result<VerificationResult> {
    HashVerifier::default().verify_expected(path, expected)
}
