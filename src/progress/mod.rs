//! Progress reporting.
//!
//! # Overview
//!
//! - `event` - [`ProgressEvent`]s and the [`ProgressCallback`] sink the
//!   engine reports to
//! - `style` - Progress bar styling options and templates
//! - `display` - `indicatif` rendering used by the command line
//!
//! # Examples
//!
//! ```rust
//! use rpip::progress::{ProgressCallback, ProgressEvent};
//! use std::sync::Arc;
//!
//! let callback: ProgressCallback = Arc::new(|event: &ProgressEvent| {
//!     println!("{} / {:?} bytes", event.bytes_downloaded, event.total_bytes);
//! });
//! ```

pub(crate) mod display;
pub(crate) mod event;
pub(crate) mod style;

pub use display::ProgressDisplay;
pub use event::{ProgressCallback, ProgressEvent, ProgressTracker};
pub use style::{ProgressBarOpts, StyleOptions};
