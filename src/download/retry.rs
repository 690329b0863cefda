//! Retry policy with linear backoff for range fetches.
//!
//! This module provides the [`RetryPolicy`] and [`FailureType`] types for
//! classifying fetch errors and deciding whether another attempt is made.
//!
//! # Overview
//!
//! When a range attempt fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - connection, read, timeout, short body, 408/429/5xx
//! - [`FailureType::Permanent`] - other 4xx, or a server that ignores `Range`
//! - [`FailureType::LinkRejected`] - HTTP 403, the source link is no longer valid
//!
//! The [`RetryPolicy`] then decides based on failure type and attempt count.
//! The wait after failed attempt `n` is `n * backoff_step` (2s, 4s, 6s, 8s with
//! defaults), and there is never a wait after the final attempt.
//!
//! # Example
//!
//! ```
//! use rangefetch_core::download::{FailureType, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! match policy.should_retry(FailureType::Transient, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::constants::{DEFAULT_BACKOFF_STEP, DEFAULT_MAX_ATTEMPTS};
use super::error::FetchError;

/// Classification of range fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    Transient,

    /// Failure that won't succeed regardless of retries.
    Permanent,

    /// The server refused the source link; only a freshly resolved link helps.
    LinkRejected,
}

impl FailureType {
    /// Whether this failure type is eligible for another attempt.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Attempt budget and backoff schedule for a range.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `backoff_step`: 2 seconds
///
/// # Delay Calculation
///
/// ```text
/// delay(attempt) = backoff_step * attempt
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Delay unit multiplied by the failed attempt number.
    backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_step: DEFAULT_BACKOFF_STEP,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy.
    ///
    /// `max_attempts` is raised to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, backoff_step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_step,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using the default step.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self::new(max_attempts, DEFAULT_BACKOFF_STEP)
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the backoff step.
    #[must_use]
    pub fn backoff_step(&self) -> Duration {
        self.backoff_step
    }

    /// Delay to wait after failed attempt `attempt` (1-indexed).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }

    /// Determines whether to retry after attempt `attempt` failed.
    #[instrument(level = "debug", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::LinkRejected => {
                return RetryDecision::DoNotRetry {
                    reason: "source link rejected - resolve the link again".to_string(),
                };
            }
            FailureType::Transient => {}
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.delay_for(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }
}

/// Classifies a fetch error into a failure type for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Connection, Timeout, Read | Transient |
/// | PayloadLengthMismatch | Transient |
/// | HTTP 408, 429, 5xx | Transient |
/// | HTTP 403 (`LinkRejected`) | LinkRejected |
/// | Other HTTP statuses | Permanent |
/// | RangeIgnored | Permanent |
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::Connection { .. }
        | FetchError::Timeout { .. }
        | FetchError::Read { .. }
        | FetchError::PayloadLengthMismatch { .. } => FailureType::Transient,
        FetchError::HttpStatus { status, .. } => classify_http_status(*status),
        FetchError::LinkRejected { .. } => FailureType::LinkRejected,
        FetchError::RangeIgnored { .. } => FailureType::Permanent,
        FetchError::Exhausted { last, .. } => classify_error(last),
    }
}

/// Classifies an HTTP status code into a failure type.
#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        403 => FailureType::LinkRejected, // Forbidden
        408 => FailureType::Transient,    // Request Timeout
        429 => FailureType::Transient,    // Too Many Requests

        status if (500..600).contains(&status) => FailureType::Transient,

        // 404, 410, 416 and the remaining client errors won't change on retry
        status if (400..500).contains(&status) => FailureType::Permanent,

        _ => FailureType::Permanent,
    }
}
