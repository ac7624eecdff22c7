//! Drives one target from strategy selection to a verified file.
//!
//! Each run walks a small state machine:
//!
//! ```text
//! Selecting -> Downloading -> Verifying -> Succeeded
//!                  |  ^            |
//!                  +--+ transient  +-----> Failed
//! ```
//!
//! Transient failures re-enter `Downloading` immediately, up to
//! `max_retries` times; each retry resumes from whatever is on disk.
//! Every other error ends the run. Nothing is ever deleted on failure.
//!
//! # Examples
//!
//! ```rust,no_run
//! use rpip::download::DownloadTarget;
//! use rpip::downloader::OrchestratorBuilder;
//! use std::convert::TryFrom;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = OrchestratorBuilder::new().directory("downloads".into()).build();
//! let targets = vec![
//!     DownloadTarget::try_from("https://example.test/torch-2.3.0-cp311-linux_x86_64.whl")?,
//!     DownloadTarget::try_from("https://example.test/numpy-1.26.4-cp311-linux_x86_64.whl")?,
//! ];
//!
//! for outcome in orchestrator.run_all(&targets).await {
//!     println!("{}: success={}", outcome.url(), outcome.success());
//! }
//! # Ok(())
//! # }
//! ```

use super::config::OrchestratorConfig;
use super::guard::DestinationGuard;
use crate::download::{DownloadOutcome, DownloadTarget, HashAlgorithm, HashVerifier, VerificationResult};
use crate::error::{Error, ErrorKind, Result};
use crate::http::create_http_client;
use crate::progress::ProgressCallback;
use crate::strategy::{
    destination_len, discard_partial, DownloaderSelector, DownloaderStrategy, ExternalDownloader,
    Fetcher, NativeDownloader,
};

use std::fmt;
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::fs;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Where a run currently stands.
#[derive(Debug)]
enum RunState {
    Selecting,
    Downloading,
    Verifying,
    Succeeded,
    Failed(Error),
}

/// Represents the download controller.
///
/// An orchestrator can be created via its builder:
///
/// ```rust
/// # fn main()  {
/// use rpip::downloader::OrchestratorBuilder;
///
/// let o = OrchestratorBuilder::new().build();
/// # }
/// ```
#[derive(Clone)]
pub struct DownloadOrchestrator {
    config: OrchestratorConfig,
}

impl fmt::Debug for DownloadOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadOrchestrator")
            .field("config", &self.config)
            .finish()
    }
}

impl DownloadOrchestrator {
    /// Creates a new orchestrator with the given configuration.
    pub(crate) fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Gets the number of retries after a transient failure.
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Whether external tools get a terminal to draw on.
    pub fn interactive(&self) -> bool {
        self.config
            .interactive
            .unwrap_or_else(|| std::io::stdout().is_terminal())
    }

    pub fn selector(&self) -> DownloaderSelector {
        DownloaderSelector::new(self.config.tool_probe.clone())
    }

    /// Download and verify a single target.
    ///
    /// Never returns an error: failures are reported in the outcome.
    pub async fn run(&self, target: &DownloadTarget) -> DownloadOutcome {
        self.run_with_progress(target, self.config.on_progress.clone())
            .await
    }

    /// Process `targets` strictly one after the other.
    ///
    /// A failed target does not stop the batch.
    pub async fn run_all(&self, targets: &[DownloadTarget]) -> Vec<DownloadOutcome> {
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            outcomes.push(self.run(target).await);
        }
        outcomes
    }

    /// Like [`run`](Self::run), reporting progress to `on_progress`.
    pub async fn run_with_progress(
        &self,
        target: &DownloadTarget,
        on_progress: Option<ProgressCallback>,
    ) -> DownloadOutcome {
        let target = self.resolve(target);
        let _guard = match DestinationGuard::acquire(target.destination()) {
            Ok(guard) => guard,
            Err(e) => {
                warn!("{}", e);
                return DownloadOutcome::failed(&target, None, &e, 0, 0);
            }
        };

        info!("Downloading {} to {:?}", target.url(), target.destination());
        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        let mut fetcher: Option<Arc<dyn Fetcher>> = None;
        let mut attempts: u32 = 0;
        let mut verification: Option<VerificationResult> = None;
        let mut state = RunState::Selecting;

        loop {
            debug!(?state, attempts, "{}", target.file_name());
            state = match state {
                RunState::Selecting => match self.select_fetcher() {
                    Ok(selected) => {
                        info!("Using {} for {}", selected.strategy(), target.file_name());
                        fetcher = Some(selected);
                        match self.already_complete(&target).await {
                            Ok(true) => RunState::Verifying,
                            Ok(false) => RunState::Downloading,
                            Err(e) => RunState::Failed(e),
                        }
                    }
                    Err(e) => RunState::Failed(e),
                },
                RunState::Downloading => match fetcher.clone() {
                    Some(selected) => {
                        attempts += 1;
                        match self
                            .attempt(selected.as_ref(), &target, on_progress.clone(), deadline)
                            .await
                        {
                            Ok(()) => RunState::Verifying,
                            Err(e)
                                if e.kind().is_retryable() && attempts <= self.config.max_retries =>
                            {
                                warn!(
                                    "Attempt {}/{} for {} failed: {}, resuming",
                                    attempts,
                                    self.config.max_retries + 1,
                                    target.file_name(),
                                    e
                                );
                                RunState::Downloading
                            }
                            Err(e) => RunState::Failed(e),
                        }
                    }
                    None => RunState::Failed(Error::Internal("no strategy selected".into())),
                },
                RunState::Verifying => match self.verify(&target).await {
                    Ok(result) => {
                        let failure = verification_failure(&result);
                        verification = Some(result);
                        match failure {
                            None => RunState::Succeeded,
                            Some(e) => RunState::Failed(e),
                        }
                    }
                    Err(e) => RunState::Failed(e),
                },
                RunState::Succeeded => {
                    let strategy = strategy_of(&fetcher).unwrap_or(DownloaderStrategy::Native);
                    let bytes = destination_len(target.destination()).await.unwrap_or(0);
                    let verification = verification.unwrap_or_else(|| {
                        VerificationResult::skipped(HashAlgorithm::Sha256.name())
                    });
                    info!(
                        "Downloaded {} ({} bytes, {})",
                        target.file_name(),
                        bytes,
                        if verification.is_verified() {
                            "verified"
                        } else {
                            "not verified"
                        }
                    );
                    return DownloadOutcome::succeeded(
                        &target,
                        strategy,
                        bytes,
                        attempts,
                        verification,
                    );
                }
                RunState::Failed(e) => {
                    let bytes = destination_len(target.destination()).await.unwrap_or(0);
                    warn!("Failed to download {}: {}", target.file_name(), e);
                    let outcome = DownloadOutcome::failed(
                        &target,
                        strategy_of(&fetcher),
                        &e,
                        bytes,
                        attempts,
                    );
                    return match verification {
                        Some(v) => outcome.with_verification(v),
                        None => outcome,
                    };
                }
            };
        }
    }

    fn resolve(&self, target: &DownloadTarget) -> DownloadTarget {
        match self.config.directory {
            Some(ref dir) if target.destination().is_relative() => {
                let destination = dir.join(target.destination());
                DownloadTarget::new(target.url(), destination)
                    .with_expected_size(target.expected_size())
                    .with_expected_hash(target.expected_hash().cloned())
            }
            _ => target.clone(),
        }
    }

    fn select_fetcher(&self) -> Result<Arc<dyn Fetcher>> {
        if let Some(ref fetcher) = self.config.fetcher {
            return Ok(fetcher.clone());
        }

        let strategy = match self.config.strategy {
            Some(forced) => {
                if let Some(program) = forced.program() {
                    if !self.config.tool_probe.is_available(program) {
                        return Err(Error::ToolNotFound {
                            tool: program.to_string(),
                        });
                    }
                }
                forced
            }
            None => self.selector().select(),
        };

        match ExternalDownloader::new(strategy, self.interactive()) {
            Some(external) => Ok(Arc::new(external)),
            None => {
                let client = create_http_client(self.config.http.clone())?;
                Ok(Arc::new(
                    NativeDownloader::new(client)
                        .with_read_timeout(self.config.read_timeout)
                        .with_chunk_size(self.config.chunk_size),
                ))
            }
        }
    }

    /// A destination already at the expected size needs no transfer.
    ///
    /// A destination larger than expected cannot be a prefix and is
    /// removed.
    async fn already_complete(&self, target: &DownloadTarget) -> Result<bool> {
        let Some(expected) = target.expected_size() else {
            return Ok(false);
        };
        let len = match fs::metadata(target.destination()).await {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            _ => return Ok(false),
        };

        if len == expected {
            info!("{} is already complete", target.file_name());
            return Ok(true);
        }
        if len > expected {
            warn!(
                "{:?} is larger than the expected {} bytes, starting over",
                target.destination(),
                expected
            );
            discard_partial(target.destination()).await?;
        }
        Ok(false)
    }

    async fn attempt(
        &self,
        fetcher: &dyn Fetcher,
        target: &DownloadTarget,
        on_progress: Option<ProgressCallback>,
        deadline: Option<Instant>,
    ) -> Result<()> {
        let fetch = fetcher.fetch(target, on_progress);
        match (deadline, self.config.timeout) {
            (Some(deadline), Some(limit)) => timeout_at(deadline, fetch)
                .await
                .map_err(|_elapsed| Error::Timeout(limit))?,
            _ => fetch.await,
        }
    }

    async fn verify(&self, target: &DownloadTarget) -> Result<VerificationResult> {
        let Some(expected) = target.expected_hash().cloned() else {
            return Ok(VerificationResult::skipped(HashAlgorithm::Sha256.name()));
        };
        let path = target.destination().to_path_buf();
        debug!("Verifying {:?} with {}", path, expected.algorithm());

        tokio::task::spawn_blocking(move || {
            HashVerifier::default().verify_expected(&path, Some(&expected))
        })
        .await
        .map_err(|e| Error::Internal(format!("verification task failed: {}", e)))?
    }
}

fn strategy_of(fetcher: &Option<Arc<dyn Fetcher>>) -> Option<DownloaderStrategy> {
    fetcher.as_ref().map(|f| f.strategy())
}

fn verification_failure(result: &VerificationResult) -> Option<Error> {
    if result.matched {
        return None;
    }
    match result.error {
        Some(ErrorKind::UnsupportedAlgorithm) => {
            Some(Error::UnsupportedAlgorithm(result.algorithm.clone()))
        }
        _ => Some(Error::IntegrityMismatch {
            algorithm: result.algorithm.clone(),
            expected: result.expected.clone().unwrap_or_default(),
            actual: result.actual.clone().unwrap_or_default(),
        }),
    }
}
