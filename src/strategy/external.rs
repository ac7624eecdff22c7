//! External tool adapter.
//!
//! Runs `aria2c`, `wget` or `curl` as a child process. The tool does its
//! own resuming and its own retries; we only map its exit status.

use super::{ensure_parent_dir, DownloaderStrategy, Fetcher};
use crate::download::DownloadTarget;
use crate::error::{Error, Result};
use crate::progress::ProgressCallback;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tracing::{debug, info, warn};

/// Number of trailing stderr lines kept for error reports.
pub const STDERR_TAIL_LINES: usize = 20;

/// Drives one external download tool.
#[derive(Debug, Clone)]
pub struct ExternalDownloader {
    strategy: DownloaderStrategy,
    program: String,
    interactive: bool,
}

impl ExternalDownloader {
    /// Returns `None` for [`DownloaderStrategy::Native`].
    pub fn new(strategy: DownloaderStrategy, interactive: bool) -> Option<Self> {
        strategy.program().map(|program| Self {
            strategy,
            program: program.to_string(),
            interactive,
        })
    }

    /// Run `program` instead of the tool found on `PATH`. It is given the
    /// command line of this strategy.
    pub fn with_program(self, program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..self
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the tool to completion.
    ///
    /// In interactive mode the tool writes straight to the terminal. In
    /// non-interactive mode its stderr is forwarded line by line to the log
    /// and the tail is kept for the error report. The child is killed if
    /// this future is dropped.
    pub async fn run(&self, target: &DownloadTarget) -> Result<()> {
        ensure_parent_dir(target.destination()).await?;

        let args = self.strategy.command_args(target, self.interactive);
        debug!("Running {} {}", self.program, args.join(" "));

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .kill_on_drop(true);
        if self.interactive {
            command.stderr(Stdio::inherit());
        } else {
            command.stderr(Stdio::piped());
        }

        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ToolNotFound {
                tool: self.program.clone(),
            },
            _ => Error::from(e),
        })?;

        let tail = match child.stderr.take() {
            Some(stderr) => self.forward_stderr(stderr).await,
            None => VecDeque::new(),
        };

        let status = child.wait().await?;
        self.check_status(status, tail)
    }

    /// Log the tool's stderr line by line and keep the tail.
    ///
    /// Lines need not be UTF-8. A read error only ends the forwarding; the
    /// exit status still decides the outcome.
    async fn forward_stderr(&self, stderr: ChildStderr) -> VecDeque<String> {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    info!("[{}] {}", self.program, line);
                    push_tail(&mut tail, line);
                }
                Err(e) => {
                    warn!("Stopped reading the output of {}: {}", self.program, e);
                    break;
                }
            }
        }
        tail
    }

    fn check_status(&self, status: ExitStatus, tail: VecDeque<String>) -> Result<()> {
        if status.success() {
            debug!("{} finished successfully", self.program);
            return Ok(());
        }
        Err(Error::SubprocessFailed {
            tool: self.program.clone(),
            exit_code: status.code(),
            stderr: Vec::from(tail).join("\n"),
        })
    }
}

fn push_tail(tail: &mut VecDeque<String>, line: String) {
    if tail.len() == STDERR_TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line);
}

#[async_trait]
impl Fetcher for ExternalDownloader {
    fn strategy(&self) -> DownloaderStrategy {
        self.strategy
    }

    async fn fetch(
        &self,
        target: &DownloadTarget,
        _on_progress: Option<ProgressCallback>,
    ) -> Result<()> {
        self.run(target).await
    }
}
