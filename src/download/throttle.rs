//! Rate-limited progress reporting.
//!
//! [`ProgressThrottle`] decides which committed-byte updates become
//! [`ProgressSample`]s. At most one sample is produced per interval, plus a
//! terminal sample when the transfer reaches its total, which is produced
//! exactly once regardless of timing.
//!
//! Speed is measured between consecutive emitted samples, not from the start
//! of the transfer, so it tracks the recent rate.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::constants::DEFAULT_PROGRESS_INTERVAL;

/// A progress snapshot for one transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSample {
    /// Bytes committed to the sink so far.
    pub bytes_transferred: u64,
    /// Total resource size.
    pub total_bytes: u64,
    /// Bytes per second since the previous sample.
    pub bytes_per_second: f64,
    /// Estimated time remaining; `None` while the speed is zero.
    pub eta: Option<Duration>,
    /// Time since the throttle was created.
    pub elapsed: Duration,
}

impl ProgressSample {
    /// Completed fraction in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.bytes_transferred as f64 / self.total_bytes as f64).clamp(0.0, 1.0)
    }

    /// Whether this is the final sample of a transfer.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.bytes_transferred >= self.total_bytes
    }
}

/// Receives throttled progress samples.
///
/// Implementations should return quickly; the transfer waits for each call
/// before committing the next range.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Called for every emitted sample, in order.
    async fn on_progress(&self, sample: &ProgressSample);
}

/// A [`ProgressSink`] that ignores every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

#[async_trait]
impl ProgressSink for NoopProgress {
    async fn on_progress(&self, _sample: &ProgressSample) {}
}

/// Per-transfer progress limiter.
///
/// Holds the time and byte count of the last emitted sample. Owned by a
/// single transfer run and dropped with it.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    started_at: Instant,
    last_emit: Option<(Instant, u64)>,
    baseline: (Instant, u64),
    finished: bool,
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}

impl ProgressThrottle {
    /// Creates a throttle that emits at most once per `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self::new_at(interval, Instant::now())
    }

    /// Creates a throttle whose clock starts at `started_at`.
    #[must_use]
    pub fn new_at(interval: Duration, started_at: Instant) -> Self {
        Self {
            interval,
            started_at,
            last_emit: None,
            baseline: (started_at, 0),
            finished: false,
        }
    }

    /// Sets the byte count already present before this run (resume offset).
    ///
    /// The first speed measurement then excludes those bytes.
    #[must_use]
    pub fn with_baseline(mut self, bytes: u64) -> Self {
        self.baseline = (self.started_at, bytes);
        self
    }

    /// Returns the configured interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns a sample if one is due at the current time.
    pub fn maybe_emit(&mut self, bytes: u64, total: u64) -> Option<ProgressSample> {
        self.maybe_emit_at(bytes, total, Instant::now())
    }

    /// Returns a sample if one is due at `now`.
    ///
    /// A sample is due when none was emitted yet, when at least the interval
    /// has passed since the previous one, or when `bytes` reached `total`
    /// for the first time.
    pub fn maybe_emit_at(&mut self, bytes: u64, total: u64, now: Instant) -> Option<ProgressSample> {
        if self.finished {
            return None;
        }

        let terminal = bytes >= total;
        let due = match self.last_emit {
            None => true,
            Some((last_time, _)) => now.saturating_duration_since(last_time) >= self.interval,
        };
        if !terminal && !due {
            return None;
        }

        let (reference_time, reference_bytes) = self.last_emit.unwrap_or(self.baseline);
        let window = now.saturating_duration_since(reference_time);
        let bytes_per_second = if window.is_zero() {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let delta = bytes.saturating_sub(reference_bytes) as f64;
            delta / window.as_secs_f64()
        };

        let eta = if terminal {
            Some(Duration::ZERO)
        } else if bytes_per_second > 0.0 {
            #[allow(clippy::cast_precision_loss)]
            let remaining = total.saturating_sub(bytes) as f64;
            Duration::try_from_secs_f64(remaining / bytes_per_second).ok()
        } else {
            None
        };

        self.last_emit = Some((now, bytes));
        self.finished = terminal;

        Some(ProgressSample {
            bytes_transferred: bytes,
            total_bytes: total,
            bytes_per_second,
            eta,
            elapsed: now.saturating_duration_since(self.started_at),
        })
    }

    /// Whether the terminal sample has been produced.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
