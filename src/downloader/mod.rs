//! Orchestration of downloads: strategy selection, retries, verification.
//!
//! # Overview
//!
//! - `orchestrator` - [`DownloadOrchestrator`], running the per-target
//!   state machine
//! - `builder` - [`OrchestratorBuilder`] for configuring an orchestrator
//! - `config` - [`OrchestratorConfig`] and its defaults
//! - `guard` - [`DestinationGuard`], keeping two runs off the same file
//!
//! # Examples
//!
//! ```rust,no_run
//! use rpip::download::DownloadTarget;
//! use rpip::downloader::OrchestratorBuilder;
//! use std::convert::TryFrom;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let target = DownloadTarget::try_from("https://example.test/pkg-1.0.whl")?
//!     .with_expected_hash(Some("sha256=2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824".parse()?));
//!
//! let outcome = OrchestratorBuilder::new().build().run(&target).await;
//! if let Some(failure) = outcome.error() {
//!     eprintln!("{} ({})", failure, failure.hint());
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod guard;
pub mod orchestrator;

pub use builder::OrchestratorBuilder;
pub use config::{OrchestratorConfig, DEFAULT_MAX_RETRIES};
pub use guard::DestinationGuard;
pub use orchestrator::DownloadOrchestrator;
