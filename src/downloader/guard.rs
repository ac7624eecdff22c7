//! One writer per destination.
//!
//! Two runs appending to the same file would interleave bytes, so a run
//! registers its destination here first and a second run for the same
//! path is turned away with [`Error::DestinationBusy`].

use crate::error::{Error, Result};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing::debug;

fn registry() -> &'static Mutex<HashSet<PathBuf>> {
    static ACTIVE: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    ACTIVE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Holds a destination for the lifetime of a run.
#[derive(Debug)]
pub struct DestinationGuard {
    path: PathBuf,
}

impl DestinationGuard {
    /// Register `destination`, failing if another run holds it.
    pub fn acquire(destination: &Path) -> Result<Self> {
        let path = std::path::absolute(destination).unwrap_or_else(|_| destination.to_path_buf());
        let mut active = registry().lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(path.clone()) {
            return Err(Error::DestinationBusy(destination.display().to_string()));
        }
        debug!("Acquired {:?}", path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DestinationGuard {
    fn drop(&mut self) {
        let mut active = registry().lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.path);
    }
}
