//! Built-in HTTP downloader with range resume.
//!
//! The resume offset is always the current length of the destination
//! file; there is no side-car state. Each request goes through these
//! steps:
//!
//! 1. Measure the destination. If it is already as long as the known total,
//!    nothing is requested.
//! 2. Send `Range: bytes=<offset>-` when there is something to continue.
//! 3. Act on the answer:
//!    - `206` with a matching `Content-Range` start: append.
//!    - `200`: the server ignored the range, truncate and write from zero.
//!    - `416`: already complete if the offset equals the known total,
//!      otherwise discard the partial file and start over once.
//!    - any other 4xx/5xx: [`Error::HttpError`].
//! 4. Stream the body in [`CHUNK_SIZE`] chunks, appending and flushing
//!    each one before reporting progress, so an interruption leaves a
//!    valid prefix on disk.
//! 5. Check the final length against the target's expected size, or the
//!    size the server announced. Falling short or running over is
//!    [`Error::IncompleteTransfer`].

use super::{destination_len, discard_partial, ensure_parent_dir, DownloaderStrategy, Fetcher};
use crate::download::DownloadTarget;
use crate::error::{Error, ErrorKind, Result};
use crate::http::RangeProbe;
use crate::progress::{ProgressCallback, ProgressTracker};
use crate::utils::content_length::{content_length, content_range};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::RANGE;
use reqwest::{Response, StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use std::path::Path;
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Size of the blocks written to disk.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Longest wait for response headers, or for the next piece of the body.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Bookkeeping for one call to [`NativeDownloader::download`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadState {
    /// Bytes at the destination, resumed bytes included.
    pub bytes_written: u64,
    /// Size of the complete artifact, once known.
    pub total_size: Option<u64>,
    /// Kind of the error that ended the call, if any.
    pub last_error: Option<ErrorKind>,
}

/// Streams artifacts over HTTP.
#[derive(Debug, Clone)]
pub struct NativeDownloader {
    client: ClientWithMiddleware,
    probe: RangeProbe,
    read_timeout: Duration,
    chunk_size: usize,
}

impl NativeDownloader {
    pub fn new(client: ClientWithMiddleware) -> Self {
        Self {
            probe: RangeProbe::new(client.clone()).with_timeout(DEFAULT_READ_TIMEOUT),
            client,
            read_timeout: DEFAULT_READ_TIMEOUT,
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Also bounds the `HEAD` probe sent before resuming.
    pub fn with_read_timeout(self, read_timeout: Duration) -> Self {
        Self {
            probe: self.probe.with_timeout(read_timeout),
            read_timeout,
            ..self
        }
    }

    pub fn with_chunk_size(self, chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            ..self
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Download `target`, continuing any partial file at its destination.
    ///
    /// A network failure mid-body yields [`Error::TransientIo`] carrying the
    /// number of bytes at the destination; calling again continues from
    /// there.
    pub async fn download(
        &self,
        target: &DownloadTarget,
        on_progress: Option<ProgressCallback>,
    ) -> Result<DownloadState> {
        let mut state = DownloadState::default();
        match self.download_inner(target, on_progress, &mut state).await {
            Ok(()) => Ok(state),
            Err(e) => {
                state.last_error = Some(e.kind());
                debug!(?state, "Download of {} stopped", target.url());
                Err(e)
            }
        }
    }

    async fn download_inner(
        &self,
        target: &DownloadTarget,
        on_progress: Option<ProgressCallback>,
        state: &mut DownloadState,
    ) -> Result<()> {
        let output = target.destination();
        let url = target.url();
        ensure_parent_dir(output).await?;

        let mut offset = destination_len(output).await?;
        let expected_total = target.expected_size();
        let mut known_total = expected_total;
        let mut tracker = ProgressTracker::new(on_progress, offset);
        state.bytes_written = offset;

        if offset > 0 {
            debug!("A partial file of {} bytes exists at {:?}", offset, output);
            let mut may_resume = true;
            if known_total != Some(offset) {
                let support = self.probe.probe(url).await;
                // A HEAD answer only decides whether the partial file is
                // usable; body lengths come from the GET response itself.
                known_total = known_total.or(support.total_size.filter(|&t| t > 0));
                may_resume = support.may_resume();
            }

            match known_total {
                Some(total) if total == offset => {
                    info!("{} is already complete", target.file_name());
                    state.total_size = Some(total);
                    tracker.set_total(Some(total));
                    tracker.update(offset);
                    return Ok(());
                }
                Some(total) if offset > total => {
                    warn!(
                        "{:?} holds {} bytes but the artifact has {}, starting over",
                        output, offset, total
                    );
                    may_resume = false;
                }
                _ => {}
            }

            if !may_resume {
                debug!("Discarding partial file {:?}", output);
                discard_partial(output).await?;
                offset = 0;
                tracker.restart();
            }
        }

        let mut restarted = false;
        loop {
            state.bytes_written = offset;
            let res = self.send(url, offset).await?;
            let status = res.status();
            debug!("GET {} answered {}", url, status);

            match status {
                StatusCode::PARTIAL_CONTENT => {
                    let range = content_range(res.headers());
                    let start = range.and_then(|r| r.start());
                    // A 206 without Content-Range to a plain GET is a whole body.
                    let whole_body = offset == 0 && start.is_none();
                    if start != Some(offset) && !whole_body {
                        if restarted {
                            return Err(Error::HttpError {
                                status: status.as_u16(),
                            });
                        }
                        warn!(
                            "Server answered range {:?} for offset {}, starting over",
                            start, offset
                        );
                        discard_partial(output).await?;
                        offset = 0;
                        restarted = true;
                        tracker.restart();
                        continue;
                    }
                    let announced = range
                        .and_then(|r| r.total)
                        .or_else(|| content_length(res.headers()).map(|len| len + offset));
                    return self
                        .stream_to_file(
                            res,
                            output,
                            offset,
                            Totals::new(announced, expected_total),
                            &mut tracker,
                            state,
                        )
                        .await;
                }
                StatusCode::OK => {
                    if offset > 0 {
                        warn!("Server ignored the range request, restarting {:?}", output);
                        discard_partial(output).await?;
                        offset = 0;
                        tracker.restart();
                    }
                    let announced = content_length(res.headers());
                    return self
                        .stream_to_file(
                            res,
                            output,
                            0,
                            Totals::new(announced, expected_total),
                            &mut tracker,
                            state,
                        )
                        .await;
                }
                StatusCode::RANGE_NOT_SATISFIABLE => {
                    let total = content_range(res.headers())
                        .and_then(|r| r.total)
                        .or(known_total);
                    if offset > 0 && total == Some(offset) {
                        info!("{} is already complete", target.file_name());
                        state.total_size = total;
                        tracker.set_total(total);
                        tracker.update(offset);
                        return Ok(());
                    }
                    if offset == 0 || restarted {
                        return Err(Error::HttpError {
                            status: status.as_u16(),
                        });
                    }
                    warn!("Range {}- not satisfiable, starting over", offset);
                    discard_partial(output).await?;
                    offset = 0;
                    restarted = true;
                    tracker.restart();
                }
                s => {
                    return Err(Error::HttpError { status: s.as_u16() });
                }
            }
        }
    }

    async fn send(&self, url: &Url, offset: u64) -> Result<Response> {
        debug!("Fetching {} from offset {}", url, offset);
        let mut req = self.client.get(url.clone());
        if offset > 0 {
            req = req.header(RANGE, format!("bytes={}-", offset));
        }
        let sent = timeout(self.read_timeout, req.send())
            .await
            .map_err(|_elapsed| Error::TransientIo {
                bytes_written: offset,
                message: format!("no response within {:?}", self.read_timeout),
            })?;
        sent.map_err(|e| match e {
            reqwest_middleware::Error::Reqwest(e) if e.is_builder() => {
                Error::InvalidUrl(format!("{}: {}", url, e))
            }
            e => Error::TransientIo {
                bytes_written: offset,
                message: e.to_string(),
            },
        })
    }

    /// Append the body of `res` to `output`, which holds `offset` bytes.
    async fn stream_to_file(
        &self,
        res: Response,
        output: &Path,
        offset: u64,
        totals: Totals,
        tracker: &mut ProgressTracker,
        state: &mut DownloadState,
    ) -> Result<()> {
        let total = totals.expected();
        debug!("Opening {:?} at offset {}", output, offset);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(output)
            .await?;

        state.total_size = total;
        tracker.set_total(total);
        let mut sink = ChunkSink {
            file,
            written: offset,
            limit: totals.announced,
            tracker,
            state,
        };

        let mut buffer: Vec<u8> = Vec::with_capacity(self.chunk_size);
        let mut stream = res.bytes_stream();
        debug!("Retrieving chunks...");
        loop {
            let item = match timeout(self.read_timeout, stream.next()).await {
                Ok(item) => item,
                Err(_elapsed) => {
                    sink.write(&buffer).await?;
                    return Err(Error::TransientIo {
                        bytes_written: sink.written,
                        message: format!("no data received for {:?}", self.read_timeout),
                    });
                }
            };

            match item {
                Some(Ok(bytes)) => {
                    buffer.extend_from_slice(&bytes);
                    while buffer.len() >= self.chunk_size {
                        let rest = buffer.split_off(self.chunk_size);
                        sink.write(&buffer).await?;
                        buffer = rest;
                    }
                }
                Some(Err(e)) => {
                    sink.write(&buffer).await?;
                    return Err(Error::TransientIo {
                        bytes_written: sink.written,
                        message: e.to_string(),
                    });
                }
                None => break,
            }
        }
        sink.write(&buffer).await?;

        match total {
            Some(expected) if sink.written != expected => Err(Error::IncompleteTransfer {
                expected,
                actual: sink.written,
            }),
            _ => {
                debug!("Wrote {} bytes to {:?}", sink.written, output);
                Ok(())
            }
        }
    }
}

/// Sizes a response body is checked against.
#[derive(Debug, Clone, Copy)]
struct Totals {
    /// What the server said the complete artifact holds.
    announced: Option<u64>,
    /// What the target says the complete artifact must hold.
    required: Option<u64>,
}

impl Totals {
    fn new(announced: Option<u64>, required: Option<u64>) -> Self {
        Self {
            announced,
            required,
        }
    }

    /// Length the finished file must have.
    fn expected(&self) -> Option<u64> {
        self.required.or(self.announced)
    }
}

/// Appends chunks to the destination and reports each one.
struct ChunkSink<'a> {
    file: File,
    written: u64,
    limit: Option<u64>,
    tracker: &'a mut ProgressTracker,
    state: &'a mut DownloadState,
}

impl ChunkSink<'_> {
    /// Write `chunk`, never growing the file past the size the server
    /// announced.
    async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let allowed = match self.limit {
            Some(total) => total.saturating_sub(self.written).min(chunk.len() as u64) as usize,
            None => chunk.len(),
        };
        if allowed < chunk.len() {
            warn!(
                "Server sent {} bytes past the announced size, ignoring them",
                chunk.len() - allowed
            );
        }
        if allowed == 0 {
            return Ok(());
        }

        self.file.write_all(&chunk[..allowed]).await?;
        self.file.flush().await?;
        self.written += allowed as u64;
        self.state.bytes_written = self.written;
        self.tracker.update(self.written);
        Ok(())
    }
}

#[async_trait]
impl Fetcher for NativeDownloader {
    fn strategy(&self) -> DownloaderStrategy {
        DownloaderStrategy::Native
    }

    async fn fetch(
        &self,
        target: &DownloadTarget,
        on_progress: Option<ProgressCallback>,
    ) -> Result<()> {
        self.download(target, on_progress).await.map(|_| ())
    }
}
