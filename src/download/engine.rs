//! Chunked transfer engine.
//!
//! This module provides [`ChunkedTransfer`], which runs one transfer from a
//! source URL to a local destination:
//!
//! 1. open the destination (fails before any network activity)
//! 2. probe the total size with `HEAD`
//! 3. partition `[0, total)` into ranges of `chunk_size` bytes
//! 4. fetch each range with per-range retry and commit it in offset order
//! 5. emit a terminal progress sample and close the destination
//!
//! The first range that fails after its retries aborts the transfer. Bytes
//! already committed stay on disk; the caller decides whether to delete them.
//!
//! # Example
//!
//! ```no_run
//! use rangefetch_core::download::{
//!     ChunkedTransfer, HttpClient, NoopProgress, RetryPolicy, TransferOptions, TransferRequest,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = ChunkedTransfer::new(
//!     HttpClient::new(),
//!     RetryPolicy::default(),
//!     TransferOptions::default(),
//! )?;
//! let request = TransferRequest::new("https://example.com/movie.mkv", "./downloads/movie.mkv");
//! let report = engine.run(&request, &NoopProgress).await?;
//! println!("{} bytes in {} chunks", report.total_bytes, report.chunks);
//! # Ok(())
//! # }
//! ```

mod manifest;
mod state;

use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{StreamExt, stream};
use reqwest::header::HeaderMap;
use tracing::{debug, info, instrument, warn};

pub use manifest::ResumeManifest;
pub use state::TransferState;

use super::client::HttpClient;
use super::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_PROGRESS_INTERVAL, MAX_CONCURRENCY};
use super::error::{FetchError, TransferError};
use super::fetcher::{ChunkResult, RangeFetcher};
use super::range::{ChunkRange, plan_ranges_from};
use super::retry::RetryPolicy;
use super::sink::SinkWriter;
use super::throttle::{ProgressSink, ProgressThrottle};

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Error type for engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// What to fetch and where to put it. Immutable for one transfer.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    source_url: String,
    destination: PathBuf,
    headers: HeaderMap,
    chunk_size: u64,
}

impl TransferRequest {
    /// Creates a request with no extra headers and the default chunk size.
    pub fn new(source_url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            destination: destination.into(),
            headers: HeaderMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets the headers sent with the probe and every range request.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the range size in bytes (at least 1).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Source URL.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Destination path.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Caller headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Range size in bytes.
    #[must_use]
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }
}

/// Engine-wide knobs shared by every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    /// Minimum spacing between non-terminal progress samples.
    pub progress_interval: Duration,
    /// Range fetches kept in flight; results are still committed in order.
    pub concurrency: usize,
    /// Continue from a matching resume manifest instead of starting over.
    pub resume: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            concurrency: MIN_CONCURRENCY,
            resume: false,
        }
    }
}

/// Summary of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// Where the bytes were written.
    pub destination: PathBuf,
    /// Size of the completed file.
    pub total_bytes: u64,
    /// Ranges fetched by this run.
    pub chunks: usize,
    /// Bytes reused from an earlier run (0 for a fresh transfer).
    pub resumed_from: u64,
    /// Whether the server ignored `Range` and the file was fetched whole.
    pub whole_resource_fallback: bool,
}

/// How the range loop ended when it did not fail.
enum RangeLoop {
    Finished { chunks: usize },
    RangeIgnored,
}

/// Runs chunked transfers with per-range retry.
#[derive(Debug, Clone)]
pub struct ChunkedTransfer {
    client: HttpClient,
    fetcher: RangeFetcher,
    options: TransferOptions,
    interrupt: Option<Arc<AtomicBool>>,
}

impl ChunkedTransfer {
    /// Creates an engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if `options.concurrency`
    /// is outside `1..=16`.
    pub fn new(
        client: HttpClient,
        retry_policy: RetryPolicy,
        options: TransferOptions,
    ) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&options.concurrency) {
            return Err(EngineError::InvalidConcurrency {
                value: options.concurrency,
            });
        }

        Ok(Self {
            fetcher: RangeFetcher::new(client.clone(), retry_policy),
            client,
            options,
            interrupt: None,
        })
    }

    /// Installs a flag that stops the transfer when set.
    ///
    /// The flag is checked before each range fetch starts and before each
    /// write; an in-flight range may still complete.
    #[must_use]
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Returns the engine options.
    #[must_use]
    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Transfers `request.source_url()` into `request.destination()`.
    ///
    /// Progress samples are delivered to `progress` in order; the last one
    /// always has `bytes_transferred == total_bytes`.
    ///
    /// # Errors
    ///
    /// Any [`TransferError`]. On failure the partially written destination
    /// is left in place.
    #[instrument(skip(self, request, progress), fields(url = %request.source_url(), destination = %request.destination().display()))]
    pub async fn run(
        &self,
        request: &TransferRequest,
        progress: &dyn ProgressSink,
    ) -> Result<TransferReport, TransferError> {
        let mut state = TransferState::Init;
        let outcome = self.run_with_state(request, progress, &mut state).await;

        match &outcome {
            Ok(report) => info!(
                bytes = report.total_bytes,
                chunks = report.chunks,
                resumed_from = report.resumed_from,
                "transfer completed"
            ),
            Err(error) => {
                state.advance(TransferState::Failed);
                warn!(kind = %error.kind(), error = %error, "transfer failed");
            }
        }
        outcome
    }

    async fn run_with_state(
        &self,
        request: &TransferRequest,
        progress: &dyn ProgressSink,
        state: &mut TransferState,
    ) -> Result<TransferReport, TransferError> {
        validate_source_url(request.source_url())?;

        let mut sink = SinkWriter::open(request.destination()).await?;
        if !self.options.resume {
            ResumeManifest::remove(request.destination()).await;
        }

        match self.transfer(request, &mut sink, progress, state).await {
            Ok(report) => {
                sink.close().await?;
                if self.options.resume {
                    ResumeManifest::remove(request.destination()).await;
                }
                state.advance(TransferState::Completed);
                Ok(report)
            }
            Err(error) => {
                if let Err(close_error) = sink.close().await {
                    warn!(error = %close_error, "failed to close destination after error");
                }
                Err(error)
            }
        }
    }

    async fn transfer(
        &self,
        request: &TransferRequest,
        sink: &mut SinkWriter,
        progress: &dyn ProgressSink,
        state: &mut TransferState,
    ) -> Result<TransferReport, TransferError> {
        state.advance(TransferState::Probing);
        let metadata = self
            .client
            .probe(request.source_url(), request.headers())
            .await?;
        let total = metadata.total_size;
        if !metadata.accepts_ranges {
            debug!("server did not advertise byte ranges, trying anyway");
        }

        let resumed_from = if self.options.resume {
            ResumeManifest::resume_offset(request.destination(), total, request.chunk_size()).await
        } else {
            0
        };
        sink.reset_to(resumed_from).await?;
        if resumed_from > 0 {
            info!(resumed_from, total, "resuming transfer");
        }

        state.advance(TransferState::Transferring);
        let mut throttle =
            ProgressThrottle::new(self.options.progress_interval).with_baseline(resumed_from);
        let ranges = plan_ranges_from(resumed_from, total, request.chunk_size());
        debug!(total, ranges = ranges.len(), chunk_size = request.chunk_size(), "planned ranges");

        let (chunks, resumed_from, whole_resource_fallback) = match self
            .fetch_ranges(request, ranges, total, sink, &mut throttle, progress)
            .await?
        {
            RangeLoop::Finished { chunks } => (chunks, resumed_from, false),
            RangeLoop::RangeIgnored => {
                warn!("server ignored Range, fetching the whole resource in one request");
                self.fetch_whole(request, total, sink, &mut throttle, progress)
                    .await?;
                (1, 0, true)
            }
        };

        state.advance(TransferState::Finalizing);
        if let Some(sample) = throttle.maybe_emit(total, total) {
            progress.on_progress(&sample).await;
        }

        Ok(TransferReport {
            destination: request.destination().to_path_buf(),
            total_bytes: total,
            chunks,
            resumed_from,
            whole_resource_fallback,
        })
    }

    /// Fetches `ranges` (up to `concurrency` in flight) and commits them in order.
    async fn fetch_ranges(
        &self,
        request: &TransferRequest,
        ranges: Vec<ChunkRange>,
        total: u64,
        sink: &mut SinkWriter,
        throttle: &mut ProgressThrottle,
        progress: &dyn ProgressSink,
    ) -> Result<RangeLoop, TransferError> {
        let run_start = sink.position();
        let fetcher = &self.fetcher;
        let url = request.source_url();
        let headers = request.headers();
        let interrupt = self.interrupt.as_deref();

        let fetches = stream::iter(ranges)
            .map(|range| async move {
                if is_set(interrupt) {
                    return Ok(None);
                }
                fetcher
                    .fetch_with_retry(url, headers, range)
                    .await
                    .map(Some)
                    .map_err(|error| (range, error))
            })
            .buffered(self.options.concurrency);
        let mut fetches = pin!(fetches);

        let mut chunks = 0;
        while let Some(fetched) = fetches.next().await {
            let chunk = match fetched {
                Ok(Some(chunk)) => chunk,
                Ok(None) => return Err(TransferError::cancelled(request.destination())),
                Err((_, FetchError::RangeIgnored { .. })) if sink.position() == run_start => {
                    return Ok(RangeLoop::RangeIgnored);
                }
                Err((range, error)) => return Err(TransferError::chunk(range, error)),
            };

            self.commit(request, &chunk, total, sink, throttle, progress)
                .await?;
            chunks += 1;
        }

        Ok(RangeLoop::Finished { chunks })
    }

    /// Restarts the destination and streams `[0, total - 1]` into it.
    ///
    /// The body is written as it arrives, so memory use does not grow with
    /// the resource size. A failed attempt restarts from offset 0 after the
    /// usual backoff.
    async fn fetch_whole(
        &self,
        request: &TransferRequest,
        total: u64,
        sink: &mut SinkWriter,
        throttle: &mut ProgressThrottle,
        progress: &dyn ProgressSink,
    ) -> Result<(), TransferError> {
        let whole = ChunkRange::whole(total)
            .ok_or_else(|| TransferError::unknown_size(request.source_url()))?;
        if self.options.resume {
            ResumeManifest::remove(request.destination()).await;
        }

        let mut attempt: u32 = 1;
        let mut high_water = 0;
        loop {
            sink.reset_to(0).await?;
            if is_set(self.interrupt.as_deref()) {
                return Err(TransferError::cancelled(request.destination()));
            }

            let Err(error) = self
                .stream_whole(request, whole, sink, throttle, progress, &mut high_water)
                .await?
            else {
                return Ok(());
            };
            let delay = self
                .fetcher
                .after_failure(whole, attempt, error)
                .map_err(|error| TransferError::chunk(whole, error))?;
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// One attempt at the whole resource.
    ///
    /// The outer error is fatal (sink failure, cancellation); the inner one
    /// is a fetch failure that may be retried. Progress is only reported past
    /// `high_water` so a restarted attempt never moves the samples backwards.
    async fn stream_whole(
        &self,
        request: &TransferRequest,
        whole: ChunkRange,
        sink: &mut SinkWriter,
        throttle: &mut ProgressThrottle,
        progress: &dyn ProgressSink,
        high_water: &mut u64,
    ) -> Result<Result<(), FetchError>, TransferError> {
        let mut body = match self
            .fetcher
            .open_range(request.source_url(), request.headers(), whole)
            .await
        {
            Ok(body) => body,
            Err(error) => return Ok(Err(error)),
        };

        loop {
            match body.next_piece().await {
                Ok(Some(piece)) => {
                    self.write_piece(request, &piece, sink).await?;
                    let committed = sink.position();
                    if committed > *high_water {
                        *high_water = committed;
                        self.report(committed, whole.length(), throttle, progress)
                            .await;
                    }
                }
                Ok(None) => return Ok(Ok(())),
                Err(error) => return Ok(Err(error)),
            }
        }
    }

    /// Writes one range and reports progress for the new committed offset.
    async fn commit(
        &self,
        request: &TransferRequest,
        chunk: &ChunkResult,
        total: u64,
        sink: &mut SinkWriter,
        throttle: &mut ProgressThrottle,
        progress: &dyn ProgressSink,
    ) -> Result<(), TransferError> {
        self.write_piece(request, &chunk.payload, sink).await?;
        let committed = sink.position();
        debug!(range = %chunk.range, committed, total, "range committed");

        if self.options.resume {
            let manifest = ResumeManifest {
                source_size: total,
                chunk_size: request.chunk_size(),
                committed_bytes: committed,
            };
            if let Err(error) = manifest.store(request.destination()).await {
                warn!(error = %error, "failed to update resume manifest");
            }
        }

        self.report(committed, total, throttle, progress).await;
        Ok(())
    }

    /// Appends `bytes` unless the transfer was interrupted.
    async fn write_piece(
        &self,
        request: &TransferRequest,
        bytes: &[u8],
        sink: &mut SinkWriter,
    ) -> Result<(), TransferError> {
        if is_set(self.interrupt.as_deref()) {
            return Err(TransferError::cancelled(request.destination()));
        }
        sink.write(bytes).await?;
        Ok(())
    }

    /// Forwards a non-terminal sample when one is due; the terminal sample
    /// is emitted once the transfer finalizes.
    async fn report(
        &self,
        committed: u64,
        total: u64,
        throttle: &mut ProgressThrottle,
        progress: &dyn ProgressSink,
    ) {
        if committed < total
            && let Some(sample) = throttle.maybe_emit(committed, total)
        {
            progress.on_progress(&sample).await;
        }
    }
}

fn is_set(flag: Option<&AtomicBool>) -> bool {
    flag.is_some_and(|flag| flag.load(Ordering::SeqCst))
}

/// Accepts absolute `http`/`https` URLs with a host.
fn validate_source_url(source_url: &str) -> Result<(), TransferError> {
    let parsed = url::Url::parse(source_url).map_err(|_| TransferError::invalid_url(source_url))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(TransferError::invalid_url(source_url));
    }
    Ok(())
}
