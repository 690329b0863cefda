//! Constants for the download module (timeouts, chunking, retry, progress).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default bound on a single probe or range attempt (2 minutes).
pub const ATTEMPT_TIMEOUT_SECS: u64 = 120;

/// Default chunk size for range requests (10 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum attempts per range, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Backoff step: the wait after failed attempt `n` is `n * step`.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_secs(2);

/// Minimum spacing between non-terminal progress samples.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(1500);

/// Upper bound for concurrent in-flight range fetches within one transfer.
pub const MAX_CONCURRENCY: usize = 16;

/// Largest buffer reserved up front for a single response body.
pub(crate) const MAX_PREALLOCATED_PAYLOAD: u64 = 16 * 1024 * 1024;
