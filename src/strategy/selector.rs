//! Choosing a download strategy.

use super::DownloaderStrategy;

use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Answers whether an executable can be run.
pub trait ToolProbe: Send + Sync {
    fn is_available(&self, program: &str) -> bool;
}

/// Looks executables up on `PATH` without running them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathProbe;

impl ToolProbe for PathProbe {
    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

impl<F> ToolProbe for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_available(&self, program: &str) -> bool {
        self(program)
    }
}

/// Picks the best available strategy.
///
/// External tools are preferred in the order aria2c, wget, curl; the
/// native downloader is used when none of them is installed. The probe is
/// consulted on every call, nothing is cached.
#[derive(Clone)]
pub struct DownloaderSelector {
    probe: Arc<dyn ToolProbe>,
}

impl fmt::Debug for DownloaderSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloaderSelector").finish_non_exhaustive()
    }
}

impl Default for DownloaderSelector {
    fn default() -> Self {
        Self::new(Arc::new(PathProbe))
    }
}

impl DownloaderSelector {
    pub fn new(probe: Arc<dyn ToolProbe>) -> Self {
        Self { probe }
    }

    pub fn select(&self) -> DownloaderStrategy {
        for strategy in DownloaderStrategy::EXTERNAL_PRIORITY {
            if let Some(program) = strategy.program() {
                if self.probe.is_available(program) {
                    debug!("Found {} on PATH", program);
                    return strategy;
                }
            }
        }
        debug!("No external downloader available, using the native one");
        DownloaderStrategy::Native
    }
}
