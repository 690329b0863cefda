//! Resumable chunked HTTP transfers.
//!
//! A transfer probes the source size, splits it into byte ranges, fetches
//! each range with its own retry budget and appends the ranges to a local
//! file in offset order, reporting throttled progress along the way.
//!
//! # Features
//!
//! - Per-range retry with linear backoff (2s, 4s, 6s, 8s by default)
//! - Flushed, in-order writes (committed bytes survive any failure)
//! - Rate-limited progress samples with speed and ETA
//! - Optional ordered concurrent range fetches
//! - Optional resume from a manifest next to the destination
//! - Structured error types with a stable [`ErrorKind`]
//!
//! # Example
//!
//! ```no_run
//! use rangefetch_core::download::{
//!     ChunkedTransfer, HttpClient, NoopProgress, RetryPolicy, TransferOptions, TransferRequest,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = ChunkedTransfer::new(HttpClient::new(), RetryPolicy::default(), TransferOptions::default())?;
//! let request = TransferRequest::new("https://example.com/archive.zip", "./downloads/archive.zip");
//! let report = engine.run(&request, &NoopProgress).await?;
//! println!("Downloaded: {}", report.destination.display());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod fetcher;
pub mod filename;
mod range;
mod retry;
mod sink;
mod throttle;

pub use client::{HttpClient, TransferMetadata};
pub use engine::{
    ChunkedTransfer, EngineError, ResumeManifest, TransferOptions, TransferReport,
    TransferRequest, TransferState,
};
pub use error::{ErrorKind, FetchError, SinkError, TransferError};
pub use fetcher::{ChunkResult, RangeFetcher};
pub use range::{ChunkRange, plan_ranges, plan_ranges_from};
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
pub use sink::SinkWriter;
pub use throttle::{NoopProgress, ProgressSample, ProgressSink, ProgressThrottle};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, TransferError>` explicitly in function signatures.
