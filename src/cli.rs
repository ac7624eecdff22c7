//! CLI argument definitions using clap derive macros.

use clap::Parser;
use rpip::download::{DownloadTarget, ExpectedHash};
use rpip::downloader::DEFAULT_MAX_RETRIES;
use rpip::strategy::{DownloaderStrategy, DEFAULT_READ_TIMEOUT};
use rpip::{Error, Result};
use std::convert::TryFrom;
use std::path::PathBuf;
use std::time::Duration;

/// Resumable downloads of large package artifacts.
///
/// Interrupted transfers are continued from the bytes already on disk when
/// the same command is run again. A digest given with `--hash`, or as a
/// `#sha256=<hex>` URL fragment, is checked once the file is complete.
#[derive(Parser, Debug)]
#[command(name = "rpip")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to download, processed one after the other
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Directory to save the files in
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Expected digest as <algorithm>=<hex>, or bare hex for SHA-256 (single URL only)
    #[arg(long)]
    pub hash: Option<String>,

    /// Expected size in bytes (single URL only)
    #[arg(long)]
    pub size: Option<u64>,

    /// Downloader to use instead of the first of aria2c, wget, curl found on PATH
    #[arg(short, long, value_parser = clap::value_parser!(DownloaderStrategy))]
    pub downloader: Option<DownloaderStrategy>,

    /// Maximum retry attempts for transient failures (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub retries: u8,

    /// Give up on a file after this many seconds, keeping the partial file
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Seconds without data from the server before the transfer is retried
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_READ_TIMEOUT.as_secs())]
    pub read_timeout: u64,

    /// Do not draw progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Default log filter for the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout.max(1))
    }

    /// Check combinations clap cannot express.
    pub fn validate(&self) -> std::result::Result<(), clap::Error> {
        if self.urls.len() > 1 && (self.hash.is_some() || self.size.is_some()) {
            return Err(clap::Error::raw(
                clap::error::ErrorKind::ArgumentConflict,
                "--hash and --size apply to a single URL; use #sha256=<hex> fragments instead\n",
            ));
        }
        Ok(())
    }

    /// Turn the positional URLs into download targets.
    pub fn targets(&self) -> Result<Vec<DownloadTarget>> {
        let hash = self
            .hash
            .as_deref()
            .map(str::parse::<ExpectedHash>)
            .transpose()?;

        self.urls
            .iter()
            .map(|raw| {
                let target = parse_target(raw)?.in_directory(&self.output);
                let target = match hash {
                    Some(ref h) => target.with_expected_hash(Some(h.clone())),
                    None => target,
                };
                Ok(match self.size {
                    Some(size) => target.with_expected_size(Some(size)),
                    None => target,
                })
            })
            .collect()
    }
}

/// Parse a URL, moving a `#<algorithm>=<hex>` fragment into the expected hash.
pub fn parse_target(raw: &str) -> Result<DownloadTarget> {
    let mut url = reqwest::Url::parse(raw)
        .map_err(|e| Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", raw, e)))?;

    let hash = match url.fragment() {
        Some(fragment) if fragment.contains('=') => Some(fragment.parse::<ExpectedHash>()?),
        _ => None,
    };
    if hash.is_some() {
        url.set_fragment(None);
    }

    Ok(DownloadTarget::try_from(&url)?.with_expected_hash(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["rpip", "https://example.test/a.whl"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.retries, 3);
        assert_eq!(args.output, PathBuf::from("."));
        assert_eq!(args.read_timeout(), Duration::from_secs(30));
        assert_eq!(args.timeout(), None);
        assert_eq!(args.log_level(), "info");
    }

    #[test]
    fn test_cli_requires_a_url() {
        let err = Args::try_parse_from(["rpip"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_verbosity() {
        let args = Args::try_parse_from(["rpip", "-vv", "https://example.test/a.whl"]).unwrap();
        assert_eq!(args.log_level(), "trace");

        let args = Args::try_parse_from(["rpip", "-q", "https://example.test/a.whl"]).unwrap();
        assert_eq!(args.log_level(), "error");
    }

    #[test]
    fn test_cli_downloader_flag() {
        let args =
            Args::try_parse_from(["rpip", "--downloader", "wget", "https://example.test/a.whl"])
                .unwrap();
        assert_eq!(args.downloader, Some(DownloaderStrategy::Wget));

        assert!(
            Args::try_parse_from(["rpip", "-d", "axel", "https://example.test/a.whl"]).is_err()
        );
    }

    #[test]
    fn test_fragment_becomes_expected_hash() {
        let raw = format!("https://example.test/a-1.0.whl#sha256={}", DIGEST);
        let target = parse_target(&raw).unwrap();

        assert_eq!(target.url().fragment(), None);
        assert_eq!(target.expected_hash().unwrap().hex_digest(), DIGEST);
        assert_eq!(target.file_name(), "a-1.0.whl");
    }

    #[test]
    fn test_hash_flag_applies_to_single_url() {
        let args = Args::try_parse_from([
            "rpip",
            "-o",
            "dist",
            "--hash",
            DIGEST,
            "--size",
            "5",
            "https://example.test/a.whl",
        ])
        .unwrap();

        let targets = args.targets().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].destination(), PathBuf::from("dist").join("a.whl"));
        assert_eq!(targets[0].expected_size(), Some(5));
        assert_eq!(targets[0].expected_hash().unwrap().algorithm(), "sha256");
    }

    #[test]
    fn test_hash_flag_rejected_for_several_urls() {
        let args = Args::try_parse_from([
            "rpip",
            "--hash",
            DIGEST,
            "https://example.test/a.whl",
            "https://example.test/b.whl",
        ])
        .unwrap();
        let err = args.validate().unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
