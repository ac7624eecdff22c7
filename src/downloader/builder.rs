//! Builder pattern implementation for creating [`DownloadOrchestrator`] instances.
//!
//! # Examples
//!
//! ```rust
//! use rpip::downloader::OrchestratorBuilder;
//! use rpip::strategy::DownloaderStrategy;
//! use std::time::Duration;
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .directory("downloads".into())
//!     .retries(5)
//!     .timeout(Duration::from_secs(3600))
//!     .strategy(DownloaderStrategy::Native)
//!     .build();
//! assert_eq!(orchestrator.max_retries(), 5);
//! ```

use super::{config::OrchestratorConfig, orchestrator::DownloadOrchestrator};
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::strategy::{DownloaderStrategy, Fetcher, ToolProbe};

use reqwest::header::{HeaderMap, HeaderValue, IntoHeaderName};
use reqwest::Proxy;
use std::{path::PathBuf, sync::Arc, time::Duration};

/// A builder used to create a [`DownloadOrchestrator`].
///
/// ```rust
/// # fn main()  {
/// use rpip::downloader::OrchestratorBuilder;
///
/// let o = OrchestratorBuilder::new().retries(5).directory("downloads".into()).build();
/// # }
/// ```
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        OrchestratorBuilder::default()
    }

    /// Sets the directory that relative destinations land in.
    pub fn directory(mut self, directory: PathBuf) -> Self {
        self.config.directory = Some(directory);
        self
    }

    /// Set the number of retries after a transient failure.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the number of retries of individual HTTP requests.
    pub fn http_retries(mut self, retries: u32) -> Self {
        self.config.http.retries = retries;
        self
    }

    /// Set the longest stall tolerated while waiting on the server.
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.config.read_timeout = read_timeout;
        self
    }

    /// Set an overall deadline per target.
    ///
    /// When it passes, the run fails with a timeout, any external tool is
    /// killed, and the partial file is left in place for a later resume.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    /// Always use `strategy` instead of probing `PATH`.
    pub fn strategy(mut self, strategy: DownloaderStrategy) -> Self {
        self.config.strategy = Some(strategy);
        self
    }

    /// Force interactive (`true`) or line-oriented (`false`) tool output.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.config.interactive = Some(interactive);
        self
    }

    /// Set the progress callback used by
    /// [`run`](DownloadOrchestrator::run).
    ///
    /// # Example
    ///
    /// ```rust
    /// use rpip::downloader::OrchestratorBuilder;
    ///
    /// let orchestrator = OrchestratorBuilder::new()
    ///     .on_progress(|event| {
    ///         println!("{} bytes", event.bytes_downloaded);
    ///     })
    ///     .build();
    /// ```
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        let callback: ProgressCallback = Arc::new(callback);
        self.config.on_progress = Some(callback);
        self
    }

    /// Replace the `PATH` lookup used to find external tools.
    pub fn tool_probe(mut self, probe: Arc<dyn ToolProbe>) -> Self {
        self.config.tool_probe = probe;
        self
    }

    /// Use `fetcher` for every target, skipping strategy selection.
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.config.fetcher = Some(fetcher);
        self
    }

    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.config.http.proxy = Some(proxy);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.http.user_agent = user_agent.into();
        self
    }

    /// Helper method to get or create a new HeaderMap.
    fn new_header(&self) -> HeaderMap {
        match self.config.http.headers {
            Some(ref h) => h.to_owned(),
            _ => HeaderMap::new(),
        }
    }

    /// Add http headers sent by the native downloader.
    ///
    /// Calling `.headers()` several times merges the maps.
    ///
    /// See also [`header()`].
    ///
    /// [`header()`]: OrchestratorBuilder::header
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut new = self.new_header();
        new.extend(headers);

        self.config.http.headers = Some(new);
        self
    }

    /// Add an http header
    ///
    /// # Example
    ///
    /// ```
    /// use reqwest::header::{self, HeaderValue};
    /// use rpip::downloader::OrchestratorBuilder;
    ///
    /// let auth = HeaderValue::from_str("Basic aGk6MTIzNDU2Cg==").expect("Invalid auth");
    ///
    /// let orchestrator = OrchestratorBuilder::new()
    ///     .header(header::AUTHORIZATION, auth)
    ///     .build();
    /// ```
    pub fn header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        let mut new = self.new_header();

        new.insert(name, value);

        self.config.http.headers = Some(new);
        self
    }

    /// Create the [`DownloadOrchestrator`] with the specified options.
    pub fn build(self) -> DownloadOrchestrator {
        DownloadOrchestrator::new(self.config)
    }
}
