//! Progress bar display for the command line.
//!
//! [`ProgressDisplay`] owns the bars and turns them into
//! [`ProgressCallback`]s for the orchestrator. Targets are processed one
//! at a time, so at most one artifact bar is alive at any moment.
//!
//! # Examples
//!
//! ```rust,no_run
//! use rpip::progress::{ProgressDisplay, StyleOptions};
//!
//! let display = ProgressDisplay::new(StyleOptions::default(), 3);
//! let bar = display.start_artifact("pkg-1.0.whl");
//! let callback = ProgressDisplay::callback(&bar);
//! // ... hand `callback` to the orchestrator ...
//! display.finish_artifact(bar);
//! display.finish();
//! ```

use super::event::{ProgressCallback, ProgressEvent};
use super::style::StyleOptions;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use std::sync::Arc;

/// Progress display manager.
pub struct ProgressDisplay {
    multi: MultiProgress,
    main: ProgressBar,
    style_options: StyleOptions,
    show_main_progress: bool,
}

impl ProgressDisplay {
    /// Create a new progress display manager.
    ///
    /// The batch counter is only drawn for more than one target.
    pub fn new(style_options: StyleOptions, total_targets: usize) -> Self {
        let multi = match style_options.is_enabled() {
            true => MultiProgress::new(),
            false => MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        };

        let show_main_progress = total_targets > 1;
        let main = if show_main_progress {
            multi.add(
                style_options
                    .main()
                    .clone()
                    .to_progress_bar(total_targets as u64),
            )
        } else {
            ProgressBar::hidden()
        };

        Self {
            multi,
            main,
            style_options,
            show_main_progress,
        }
    }

    /// Add a bar for the artifact about to be downloaded.
    pub fn start_artifact(&self, name: &str) -> ProgressBar {
        self.main.set_message(name.to_string());
        self.multi
            .add(self.style_options.child().clone().to_progress_bar(0))
    }

    /// Build a progress callback driving `pb`.
    pub fn callback(pb: &ProgressBar) -> ProgressCallback {
        let pb = pb.clone();
        Arc::new(move |event: &ProgressEvent| {
            if let Some(total) = event.total_bytes {
                if pb.length() != Some(total) {
                    pb.set_length(total);
                }
            }
            pb.set_position(event.bytes_downloaded);
        })
    }

    /// Finish an artifact bar and advance the batch counter.
    pub fn finish_artifact(&self, pb: ProgressBar) {
        if self.style_options.child().clear {
            pb.finish_and_clear();
        } else {
            pb.finish();
        }
        self.main.inc(1);
    }

    /// Print a line above the bars without garbling them.
    pub fn println(&self, line: impl AsRef<str>) {
        // A hidden draw target swallows printed lines.
        if !self.style_options.is_enabled() || self.multi.println(line.as_ref()).is_err() {
            eprintln!("{}", line.as_ref());
        }
    }

    /// Finish the display, clearing or keeping the counter per configuration.
    pub fn finish(self) {
        if self.show_main_progress {
            if self.style_options.main().clear {
                self.main.finish_and_clear();
            } else {
                self.main.finish();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressBarOpts;
    use std::time::Duration;

    #[test]
    fn test_callback_moves_bar() {
        let style = StyleOptions::new(ProgressBarOpts::hidden(), ProgressBarOpts::hidden());
        let display = ProgressDisplay::new(style, 1);
        let pb = display.start_artifact("pkg-1.0.whl");
        let callback = ProgressDisplay::callback(&pb);

        callback(&ProgressEvent {
            bytes_downloaded: 1024,
            total_bytes: Some(4096),
            elapsed: Duration::from_millis(5),
            bytes_per_second: 0.0,
        });

        assert_eq!(pb.position(), 1024);
        assert_eq!(pb.length(), Some(4096));
        display.finish_artifact(pb);
        display.finish();
    }
}
