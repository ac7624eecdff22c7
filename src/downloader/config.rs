//! Configuration structures and defaults for the orchestrator.
//!
//! # Examples
//!
//! ```rust
//! use rpip::downloader::OrchestratorConfig;
//! use std::time::Duration;
//!
//! let config = OrchestratorConfig {
//!     max_retries: 5,
//!     timeout: Some(Duration::from_secs(3600)),
//!     ..OrchestratorConfig::default()
//! };
//! assert_eq!(config.http.retries, 3);
//! ```

use crate::http::HttpClientConfig;
use crate::progress::ProgressCallback;
use crate::strategy::{
    DownloaderStrategy, Fetcher, PathProbe, ToolProbe, CHUNK_SIZE, DEFAULT_READ_TIMEOUT,
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default number of retries after a transient failure.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration structure for the orchestrator
#[derive(Clone)]
pub struct OrchestratorConfig {
    /// Directory that relative destinations are resolved against.
    pub directory: Option<PathBuf>,
    /// Retries after a transient failure, on top of the first attempt.
    pub max_retries: u32,
    /// HTTP client settings for the native downloader.
    pub http: HttpClientConfig,
    /// Longest stall tolerated while waiting on the server.
    pub read_timeout: Duration,
    /// Overall deadline for one target, all attempts included.
    pub timeout: Option<Duration>,
    /// Bytes written to disk per chunk by the native downloader.
    pub chunk_size: usize,
    /// Use this strategy instead of probing `PATH`.
    pub strategy: Option<DownloaderStrategy>,
    /// Force interactive or quiet output from external tools. Defaults to
    /// whether stdout is a terminal.
    pub interactive: Option<bool>,
    /// Progress sink used by [`run`](super::DownloadOrchestrator::run).
    pub on_progress: Option<ProgressCallback>,
    /// How external tools are located.
    pub tool_probe: Arc<dyn ToolProbe>,
    /// Bypasses strategy selection entirely.
    pub fetcher: Option<Arc<dyn Fetcher>>,
}

impl std::fmt::Debug for OrchestratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorConfig")
            .field("directory", &self.directory)
            .field("max_retries", &self.max_retries)
            .field("http", &self.http)
            .field("read_timeout", &self.read_timeout)
            .field("timeout", &self.timeout)
            .field("chunk_size", &self.chunk_size)
            .field("strategy", &self.strategy)
            .field("interactive", &self.interactive)
            .field("on_progress", &self.on_progress.is_some())
            .field("fetcher", &self.fetcher.as_ref().map(|f| f.strategy()))
            .finish()
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            directory: None,
            max_retries: DEFAULT_MAX_RETRIES,
            http: HttpClientConfig::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            timeout: None,
            chunk_size: CHUNK_SIZE,
            strategy: None,
            interactive: None,
            on_progress: None,
            tool_probe: Arc::new(PathProbe),
            fetcher: None,
        }
    }
}
