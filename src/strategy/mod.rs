//! Download strategies.
//!
//! A strategy is the mechanism used to move bytes from a URL to a file: an
//! external tool found on `PATH`, or the built-in [`NativeDownloader`].
//! Every strategy implements [`Fetcher`], so the orchestrator can drive
//! them interchangeably.
//!
//! # Overview
//!
//! - `selector` - [`DownloaderSelector`], picking the best available tool
//! - `external` - [`ExternalDownloader`], running `aria2c`, `wget` or `curl`
//! - `native` - [`NativeDownloader`], streaming HTTP with range resume
//!
//! # Examples
//!
//! ```rust
//! use rpip::download::DownloadTarget;
//! use rpip::strategy::DownloaderStrategy;
//! use std::convert::TryFrom;
//!
//! let target = DownloadTarget::try_from("https://example.test/pkg-1.0.whl").unwrap();
//! let args = DownloaderStrategy::Curl.command_args(&target, false);
//! assert_eq!(args.first().map(String::as_str), Some("-C"));
//! ```

pub(crate) mod external;
pub(crate) mod native;
pub(crate) mod selector;

pub use external::{ExternalDownloader, STDERR_TAIL_LINES};
pub use native::{DownloadState, NativeDownloader, CHUNK_SIZE, DEFAULT_READ_TIMEOUT};
pub use selector::{DownloaderSelector, PathProbe, ToolProbe};

use crate::download::DownloadTarget;
use crate::error::{Error, Result};
use crate::progress::ProgressCallback;

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::debug;

/// The mechanism used to perform a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloaderStrategy {
    Aria2c,
    Wget,
    Curl,
    Native,
}

impl DownloaderStrategy {
    /// External tools, most capable first.
    pub const EXTERNAL_PRIORITY: [DownloaderStrategy; 3] = [
        DownloaderStrategy::Aria2c,
        DownloaderStrategy::Wget,
        DownloaderStrategy::Curl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DownloaderStrategy::Aria2c => "aria2c",
            DownloaderStrategy::Wget => "wget",
            DownloaderStrategy::Curl => "curl",
            DownloaderStrategy::Native => "native",
        }
    }

    /// Executable to look up on `PATH`, `None` for the native downloader.
    pub fn program(&self) -> Option<&'static str> {
        match self {
            DownloaderStrategy::Native => None,
            external => Some(external.name()),
        }
    }

    pub fn is_external(&self) -> bool {
        self.program().is_some()
    }

    /// Arguments for the external tool, URL last.
    ///
    /// Every invocation continues a partial file in place and refuses to
    /// rename the output. With `interactive == false` the tools are asked
    /// for line-oriented output only. Returns an empty list for
    /// [`DownloaderStrategy::Native`].
    pub fn command_args(&self, target: &DownloadTarget, interactive: bool) -> Vec<String> {
        let destination = target.destination();
        let path = destination.to_string_lossy().into_owned();
        let mut args: Vec<String> = Vec::new();

        match self {
            DownloaderStrategy::Aria2c => {
                args.push("-c".into());
                if let Some(dir) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
                    args.push("-d".into());
                    args.push(dir.to_string_lossy().into_owned());
                }
                args.push("-o".into());
                args.push(target.file_name());
                args.push("--auto-file-renaming=false".into());
                if !interactive {
                    args.push("--summary-interval=0".into());
                    args.push("--show-console-readout=false".into());
                }
            }
            DownloaderStrategy::Wget => {
                args.push("-c".into());
                args.push("-O".into());
                args.push(path);
                if !interactive {
                    args.push("-nv".into());
                }
            }
            DownloaderStrategy::Curl => {
                args.extend(["-C", "-", "-L", "--fail", "-o"].map(String::from));
                args.push(path);
                if !interactive {
                    args.push("-s".into());
                    args.push("-S".into());
                }
            }
            DownloaderStrategy::Native => return args,
        }

        args.push(target.url().to_string());
        args
    }
}

impl fmt::Display for DownloaderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DownloaderStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aria2c" | "aria2" => Ok(DownloaderStrategy::Aria2c),
            "wget" => Ok(DownloaderStrategy::Wget),
            "curl" => Ok(DownloaderStrategy::Curl),
            "native" | "builtin" => Ok(DownloaderStrategy::Native),
            other => Err(format!(
                "unknown downloader \"{}\" (expected aria2c, wget, curl or native)",
                other
            )),
        }
    }
}

/// Something that can move one target's bytes to disk.
///
/// A fetch leaves whatever it managed to write at the destination, so a
/// later call can continue from there. Verification is not a fetcher's
/// concern.
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn strategy(&self) -> DownloaderStrategy;

    async fn fetch(
        &self,
        target: &DownloadTarget,
        on_progress: Option<ProgressCallback>,
    ) -> Result<()>;
}

/// Length of the file at `path`, `0` if it does not exist.
pub(crate) async fn destination_len(path: &Path) -> Result<u64> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(Error::from(e)),
    }
}

/// Create the parent directory of `path` if needed.
pub(crate) async fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        debug!("Creating destination directory {:?}", dir);
        fs::create_dir_all(dir).await?;
    }
    Ok(())
}

/// Remove a partial file, ignoring a missing one.
pub(crate) async fn discard_partial(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::from(e)),
    }
}
