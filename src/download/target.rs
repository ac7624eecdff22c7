//! The artifact to download.
//!
//! A [`DownloadTarget`] is what the package resolver hands over: a URL,
//! where the bytes should land, and optionally the size and digest the
//! artifact must have.
//!
//! # Examples
//!
//! ```rust
//! use rpip::download::DownloadTarget;
//! use std::convert::TryFrom;
//!
//! // Destination derived from the URL
//! let target = DownloadTarget::try_from("https://example.test/pkg-1.0.whl")?;
//! assert_eq!(target.destination().to_str(), Some("pkg-1.0.whl"));
//! # Ok::<(), rpip::Error>(())
//! ```

use crate::download::hash::ExpectedHash;
use crate::error::Error;

use reqwest::Url;
use std::convert::TryFrom;
use std::path::{Path, PathBuf};

/// Represents a file to be downloaded.
///
/// Immutable once constructed; the `with_*` methods consume and return a
/// new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    url: Url,
    destination: PathBuf,
    expected_size: Option<u64>,
    expected_hash: Option<ExpectedHash>,
}

impl DownloadTarget {
    /// Creates a new [`DownloadTarget`] saving `url` to `destination`.
    pub fn new(url: &Url, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.clone(),
            destination: destination.into(),
            expected_size: None,
            expected_hash: None,
        }
    }

    /// Set the size the artifact must have once complete.
    pub fn with_expected_size(self, expected_size: Option<u64>) -> Self {
        Self {
            expected_size,
            ..self
        }
    }

    /// Set the digest the artifact must match.
    pub fn with_expected_hash(self, expected_hash: Option<ExpectedHash>) -> Self {
        Self {
            expected_hash,
            ..self
        }
    }

    /// Move the destination into `directory`, keeping its file name.
    pub fn in_directory(self, directory: &Path) -> Self {
        let destination = match self.destination.file_name() {
            Some(name) => directory.join(name),
            None => directory.join(&self.destination),
        };
        Self {
            destination,
            ..self
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn expected_size(&self) -> Option<u64> {
        self.expected_size
    }

    pub fn expected_hash(&self) -> Option<&ExpectedHash> {
        self.expected_hash.as_ref()
    }

    /// File name of the destination, for logs and progress messages.
    pub fn file_name(&self) -> String {
        self.destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.destination.display().to_string())
    }
}

impl TryFrom<&Url> for DownloadTarget {
    type Error = crate::error::Error;

    fn try_from(value: &Url) -> Result<Self, Self::Error> {
        let segment = value
            .path_segments()
            .ok_or_else(|| {
                Error::InvalidUrl(format!(
                    "The url \"{}\" does not contain a valid path",
                    value
                ))
            })?
            .next_back()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| {
                Error::InvalidUrl(format!("The url \"{}\" does not contain a filename", value))
            })?;

        let filename = urlencoding::decode(segment)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| segment.to_string());
        if !is_plain_file_name(&filename) {
            return Err(Error::InvalidUrl(format!(
                "The url \"{}\" names an unsafe file \"{}\"",
                value, filename
            )));
        }

        Ok(DownloadTarget::new(value, filename))
    }
}

/// A decoded segment must stay a single path component.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

impl TryFrom<&str> for DownloadTarget {
    type Error = crate::error::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Url::parse(value)
            .map_err(|e| {
                Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", value, e))
            })
            .and_then(|u| DownloadTarget::try_from(&u))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_derives_file_name() {
        let target = DownloadTarget::try_from("https://example.test/simple/pkg-1.0.whl").unwrap();
        assert_eq!(target.destination(), Path::new("pkg-1.0.whl"));
        assert_eq!(target.file_name(), "pkg-1.0.whl");
        assert!(target.expected_size().is_none());
        assert!(target.expected_hash().is_none());
    }

    #[test]
    fn test_try_from_decodes_file_name() {
        let target =
            DownloadTarget::try_from("https://example.test/files/torch%2B1.0-cp312.whl").unwrap();
        assert_eq!(target.file_name(), "torch+1.0-cp312.whl");

        let target =
            DownloadTarget::try_from("https://example.test/files/torch-2.0+cpu.whl").unwrap();
        assert_eq!(target.file_name(), "torch-2.0+cpu.whl");
    }

    #[test]
    fn test_try_from_rejects_directory_url() {
        let err = DownloadTarget::try_from("https://example.test/files/").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_try_from_rejects_encoded_separators() {
        for url in [
            "https://example.test/files/..%2F..%2Fevil.whl",
            "https://example.test/files/..%5Cevil.whl",
            "https://example.test/files/evil%00.whl",
        ] {
            let err = DownloadTarget::try_from(url).unwrap_err();
            assert!(matches!(err, Error::InvalidUrl(_)), "{}", url);
        }
    }

    #[test]
    fn test_try_from_rejects_garbage() {
        let err = DownloadTarget::try_from("not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_in_directory_keeps_file_name() {
        let target = DownloadTarget::try_from("https://example.test/pkg-1.0.whl")
            .unwrap()
            .in_directory(Path::new("/tmp/cache"));
        assert_eq!(target.destination(), Path::new("/tmp/cache/pkg-1.0.whl"));
    }

    #[test]
    fn test_builders_do_not_touch_other_fields() {
        let url = Url::parse("https://example.test/pkg-1.0.whl").unwrap();
        let target = DownloadTarget::new(&url, "out.whl")
            .with_expected_size(Some(4096))
            .with_expected_hash(Some(ExpectedHash::new("sha256", "ab")));
        assert_eq!(target.url(), &url);
        assert_eq!(target.expected_size(), Some(4096));
        assert_eq!(target.expected_hash().unwrap().algorithm(), "sha256");
    }
}
