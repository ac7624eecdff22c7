//! Progress events emitted by the native downloader.
//!
//! The engine only guarantees accurate byte counts delivered after every
//! chunk; rendering is up to whoever installs the callback.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Snapshot of a transfer, produced after each chunk and never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// Bytes persisted at the destination, including resumed bytes.
    pub bytes_downloaded: u64,
    /// Total size of the artifact, if known.
    pub total_bytes: Option<u64>,
    /// Time since the download call started.
    pub elapsed: Duration,
    /// Instantaneous rate between this event and the previous one.
    pub bytes_per_second: f64,
}

impl ProgressEvent {
    /// Completion ratio in `[0, 1]`, if the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(1.0),
            Some(total) => Some((self.bytes_downloaded as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// Callback type for progress events.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Turns byte counts into [`ProgressEvent`]s and hands them to a callback.
pub struct ProgressTracker {
    callback: Option<ProgressCallback>,
    total_bytes: Option<u64>,
    started: Instant,
    last_at: Instant,
    last_bytes: u64,
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("callback", &self.callback.is_some())
            .field("total_bytes", &self.total_bytes)
            .field("last_bytes", &self.last_bytes)
            .finish()
    }
}

impl ProgressTracker {
    /// Start tracking a transfer that already has `resumed_bytes` on disk.
    pub fn new(callback: Option<ProgressCallback>, resumed_bytes: u64) -> Self {
        let now = Instant::now();
        Self {
            callback,
            total_bytes: None,
            started: now,
            last_at: now,
            last_bytes: resumed_bytes,
        }
    }

    pub fn set_total(&mut self, total_bytes: Option<u64>) {
        self.total_bytes = total_bytes;
    }

    /// Forget previous counts after the destination was truncated.
    pub fn restart(&mut self) {
        self.last_bytes = 0;
        self.last_at = Instant::now();
    }

    /// Record that `bytes_downloaded` bytes are now on disk and notify.
    pub fn update(&mut self, bytes_downloaded: u64) -> ProgressEvent {
        let now = Instant::now();
        let delta_secs = now.duration_since(self.last_at).as_secs_f64();
        let delta_bytes = bytes_downloaded.saturating_sub(self.last_bytes);
        let bytes_per_second = if delta_secs > 0.0 {
            delta_bytes as f64 / delta_secs
        } else {
            0.0
        };

        self.last_at = now;
        self.last_bytes = bytes_downloaded;

        let event = ProgressEvent {
            bytes_downloaded,
            total_bytes: self.total_bytes,
            elapsed: now.duration_since(self.started),
            bytes_per_second,
        };
        if let Some(ref callback) = self.callback {
            callback(&event);
        }
        event
    }
}
