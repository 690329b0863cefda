//! Error types for the download module.
//!
//! Errors are layered the way a transfer fails:
//! - [`FetchError`] - one range request (network, status, body length)
//! - [`SinkError`] - the local destination file
//! - [`TransferError`] - the whole transfer, wrapping the other two
//!
//! Every error maps to a stable [`ErrorKind`] and a human-facing message so
//! callers can present `{kind, message}` without matching on variants.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::range::ChunkRange;

/// Suggestion attached to rejected source links.
const RELINK_SUGGESTION: &str =
    "The source link is expired or invalid. Resolve the share link again and retry with the new URL.";

/// Stable classification of transfer failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The size probe failed (network error or non-2xx status).
    ProbeError,
    /// The probe reported no size or a size of zero.
    UnknownSize,
    /// Connecting or sending failed, including per-attempt timeouts.
    ConnectionError,
    /// The response body stream broke mid-read.
    ReadError,
    /// The server answered with an unexpected status or ignored `Range`.
    ProtocolError,
    /// The server explicitly refused the source link (HTTP 403).
    LinkRejected,
    /// The body length differed from the requested range length.
    PayloadLengthMismatch,
    /// The destination could not be opened, written or flushed.
    SinkError,
    /// A range exhausted its retry budget.
    ChunkError,
    /// The caller interrupted the transfer.
    Cancelled,
    /// The source URL is not a valid http(s) URL.
    InvalidUrl,
}

impl ErrorKind {
    /// Returns the stable label used in logs and CLI output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProbeError => "ProbeError",
            Self::UnknownSize => "UnknownSize",
            Self::ConnectionError => "ConnectionError",
            Self::ReadError => "ReadError",
            Self::ProtocolError => "ProtocolError",
            Self::LinkRejected => "LinkRejected",
            Self::PayloadLengthMismatch => "PayloadLengthMismatch",
            Self::SinkError => "SinkError",
            Self::ChunkError => "ChunkError",
            Self::Cancelled => "Cancelled",
            Self::InvalidUrl => "InvalidUrl",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from fetching a single byte range.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure before a response arrived.
    #[error("connection error fetching {range} of {url}: {source}")]
    Connection {
        /// Source URL.
        url: String,
        /// Requested range.
        range: ChunkRange,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The attempt exceeded its time bound.
    #[error("timeout fetching {range} of {url}")]
    Timeout {
        /// Source URL.
        url: String,
        /// Requested range.
        range: ChunkRange,
    },

    /// The body stream failed after the response started.
    #[error("read error fetching {range} of {url}: {source}")]
    Read {
        /// Source URL.
        url: String,
        /// Requested range.
        range: ChunkRange,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status other than 403.
    #[error("HTTP {status} fetching {range} of {url}")]
    HttpStatus {
        /// Source URL.
        url: String,
        /// Requested range.
        range: ChunkRange,
        /// Response status code.
        status: u16,
    },

    /// The server refused the link outright.
    #[error("[LINK] source link rejected (HTTP {status}) for {url}\n  Suggestion: {RELINK_SUGGESTION}")]
    LinkRejected {
        /// Source URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// Body length differs from the requested range length.
    #[error("payload length mismatch for {range}: expected {expected} bytes, got {actual}")]
    PayloadLengthMismatch {
        /// Requested range.
        range: ChunkRange,
        /// Bytes the range asked for.
        expected: u64,
        /// Bytes received (or received so far when the body overflowed).
        actual: u64,
    },

    /// The server answered `200` with the whole resource instead of the range.
    #[error("server ignored Range header for {range} of {url}")]
    RangeIgnored {
        /// Source URL.
        url: String,
        /// Requested range.
        range: ChunkRange,
    },

    /// The range failed after retrying, or its budget allowed one attempt.
    ///
    /// `last` is the error of the final attempt, which may be non-retryable
    /// (a 403 after earlier 5xx answers).
    #[error("giving up on {range} after {attempts} attempts: {last}")]
    Exhausted {
        /// Range that could not be fetched.
        range: ChunkRange,
        /// Attempts made.
        attempts: u32,
        /// Error of the final attempt.
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Creates a connection error, promoting client timeouts to [`FetchError::Timeout`].
    pub fn connection(url: impl Into<String>, range: ChunkRange, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::timeout(url, range);
        }
        Self::Connection {
            url: url.into(),
            range,
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>, range: ChunkRange) -> Self {
        Self::Timeout {
            url: url.into(),
            range,
        }
    }

    /// Creates a body read error, promoting client timeouts to [`FetchError::Timeout`].
    pub fn read(url: impl Into<String>, range: ChunkRange, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::timeout(url, range);
        }
        Self::Read {
            url: url.into(),
            range,
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, range: ChunkRange, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            range,
            status,
        }
    }

    /// Creates a link-rejected error.
    pub fn link_rejected(url: impl Into<String>, status: u16) -> Self {
        Self::LinkRejected {
            url: url.into(),
            status,
        }
    }

    /// Creates a payload length mismatch error.
    #[must_use]
    pub fn payload_length_mismatch(range: ChunkRange, actual: u64) -> Self {
        Self::PayloadLengthMismatch {
            range,
            expected: range.length(),
            actual,
        }
    }

    /// Creates a range-ignored error.
    pub fn range_ignored(url: impl Into<String>, range: ChunkRange) -> Self {
        Self::RangeIgnored {
            url: url.into(),
            range,
        }
    }

    /// Wraps the final error of a range that was attempted `attempts` times.
    #[must_use]
    pub fn exhausted(range: ChunkRange, attempts: u32, last: FetchError) -> Self {
        Self::Exhausted {
            range,
            attempts,
            last: Box::new(last),
        }
    }

    /// Classification of this error; exhausted errors report their last cause.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } | Self::Timeout { .. } => ErrorKind::ConnectionError,
            Self::Read { .. } => ErrorKind::ReadError,
            Self::HttpStatus { .. } | Self::RangeIgnored { .. } => ErrorKind::ProtocolError,
            Self::LinkRejected { .. } => ErrorKind::LinkRejected,
            Self::PayloadLengthMismatch { .. } => ErrorKind::PayloadLengthMismatch,
            Self::Exhausted { last, .. } => last.kind(),
        }
    }

    /// Number of attempts recorded by an exhausted error, otherwise 1.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            _ => 1,
        }
    }

    /// The error of the final attempt (self unless exhausted).
    #[must_use]
    pub fn root(&self) -> &FetchError {
        match self {
            Self::Exhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

/// Errors from the local destination file.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Opening the destination failed (after the directory retry).
    #[error("cannot open destination {path}: {source}")]
    Open {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Creating the destination's parent directories failed.
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Writing, truncating or positioning the destination failed.
    #[error("IO error writing to {path}: {source}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Flushing or syncing on close failed.
    #[error("cannot flush destination {path}: {source}")]
    Close {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl SinkError {
    /// Creates an open error.
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates a directory creation error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Creates a write error.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a close error.
    pub fn close(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Close {
            path: path.into(),
            source,
        }
    }
}

/// Errors that end a transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The source URL cannot be used.
    #[error("invalid source URL: {url}")]
    InvalidUrl {
        /// The rejected URL string.
        url: String,
    },

    /// The size probe could not reach the server.
    #[error("size probe failed for {url}: {source}")]
    ProbeNetwork {
        /// Source URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The size probe returned a non-success status.
    #[error("size probe returned HTTP {status} for {url}")]
    ProbeStatus {
        /// Source URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// The probe reported a missing or zero size.
    #[error("could not determine file size for {url}")]
    UnknownSize {
        /// Source URL.
        url: String,
    },

    /// A range failed terminally.
    #[error("chunk {range} failed: {source}")]
    Chunk {
        /// The failed range.
        range: ChunkRange,
        /// Terminal fetch error for that range.
        #[source]
        source: FetchError,
    },

    /// Destination file failure.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The caller interrupted the transfer between ranges.
    #[error("transfer to {path} cancelled")]
    Cancelled {
        /// Destination path.
        path: PathBuf,
    },
}

impl TransferError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a probe network error.
    pub fn probe_network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::ProbeNetwork {
            url: url.into(),
            source,
        }
    }

    /// Creates a probe status error.
    pub fn probe_status(url: impl Into<String>, status: u16) -> Self {
        Self::ProbeStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an unknown size error.
    pub fn unknown_size(url: impl Into<String>) -> Self {
        Self::UnknownSize { url: url.into() }
    }

    /// Creates a chunk failure.
    #[must_use]
    pub fn chunk(range: ChunkRange, source: FetchError) -> Self {
        Self::Chunk { range, source }
    }

    /// Creates a cancellation error.
    pub fn cancelled(path: impl Into<PathBuf>) -> Self {
        Self::Cancelled { path: path.into() }
    }

    /// Classification of this failure.
    ///
    /// A rejected link keeps its own kind even when it surfaced from a chunk,
    /// so callers can tell "re-resolve the link" apart from "retry later".
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::ProbeNetwork { .. } | Self::ProbeStatus { .. } => ErrorKind::ProbeError,
            Self::UnknownSize { .. } => ErrorKind::UnknownSize,
            Self::Chunk { source, .. } if source.kind() == ErrorKind::LinkRejected => {
                ErrorKind::LinkRejected
            }
            Self::Chunk { .. } => ErrorKind::ChunkError,
            Self::Sink(_) => ErrorKind::SinkError,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// The range that failed, when the failure belongs to one.
    #[must_use]
    pub fn failed_range(&self) -> Option<ChunkRange> {
        match self {
            Self::Chunk { range, .. } => Some(*range),
            _ => None,
        }
    }

    /// One-paragraph message suitable for showing to a person.
    #[must_use]
    pub fn human_message(&self) -> String {
        let base = self.to_string();
        if base.contains("Suggestion:") {
            return base;
        }

        let suggestion = match self.kind() {
            ErrorKind::LinkRejected => RELINK_SUGGESTION,
            ErrorKind::ProbeError if matches!(self, Self::ProbeStatus { status: 403, .. }) => {
                RELINK_SUGGESTION
            }
            ErrorKind::ProbeError => {
                "Check network connectivity and that the URL points at a downloadable file."
            }
            ErrorKind::UnknownSize => {
                "The server did not report a file size; the link may not be a direct download link."
            }
            ErrorKind::ChunkError => {
                "The transfer gave up after repeated failures. Run it again later; use --resume to keep completed chunks."
            }
            ErrorKind::SinkError => "Check that the output directory is writable and has free space.",
            ErrorKind::Cancelled => "Run again to restart; use --resume to keep completed chunks.",
            ErrorKind::InvalidUrl => "Use an http:// or https:// URL.",
            ErrorKind::ConnectionError
            | ErrorKind::ReadError
            | ErrorKind::ProtocolError
            | ErrorKind::PayloadLengthMismatch => "Retry the transfer later.",
        };
        format!("{base}\n  Suggestion: {suggestion}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn range() -> ChunkRange {
        ChunkRange::new(10, 19).unwrap()
    }

    #[test]
    fn test_fetch_error_kinds() {
        let url = "https://example.com/file.bin";
        assert_eq!(
            FetchError::timeout(url, range()).kind(),
            ErrorKind::ConnectionError
        );
        assert_eq!(
            FetchError::http_status(url, range(), 503).kind(),
            ErrorKind::ProtocolError
        );
        assert_eq!(
            FetchError::range_ignored(url, range()).kind(),
            ErrorKind::ProtocolError
        );
        assert_eq!(
            FetchError::link_rejected(url, 403).kind(),
            ErrorKind::LinkRejected
        );
        assert_eq!(
            FetchError::payload_length_mismatch(range(), 9).kind(),
            ErrorKind::PayloadLengthMismatch
        );
    }

    #[test]
    fn test_exhausted_reports_last_cause() {
        let last = FetchError::payload_length_mismatch(range(), 9);
        let error = FetchError::exhausted(range(), 5, last);
        assert_eq!(error.kind(), ErrorKind::PayloadLengthMismatch);
        assert_eq!(error.attempts(), 5);
        assert!(matches!(
            error.root(),
            FetchError::PayloadLengthMismatch { actual: 9, .. }
        ));
        let msg = error.to_string();
        assert!(msg.contains("5 attempts"), "Expected attempt count in: {msg}");
        assert!(msg.contains("[10, 19]"), "Expected range in: {msg}");
    }

    #[test]
    fn test_payload_length_mismatch_display() {
        let msg = FetchError::payload_length_mismatch(range(), 9).to_string();
        assert!(msg.contains("expected 10 bytes"), "got: {msg}");
        assert!(msg.contains("got 9"), "got: {msg}");
    }

    #[test]
    fn test_link_rejected_display_has_suggestion() {
        let msg = FetchError::link_rejected("https://example.com/f", 403).to_string();
        assert!(msg.starts_with("[LINK]"), "got: {msg}");
        assert!(msg.contains("403"), "got: {msg}");
        assert!(msg.contains("Resolve the share link again"), "got: {msg}");
    }

    #[test]
    fn test_transfer_error_chunk_kind_and_range() {
        let error = TransferError::chunk(
            range(),
            FetchError::exhausted(range(), 5, FetchError::timeout("u", range())),
        );
        assert_eq!(error.kind(), ErrorKind::ChunkError);
        assert_eq!(error.failed_range(), Some(range()));
    }

    #[test]
    fn test_transfer_error_chunk_link_rejected_keeps_kind() {
        let error = TransferError::chunk(range(), FetchError::link_rejected("u", 403));
        assert_eq!(error.kind(), ErrorKind::LinkRejected);
        assert!(error.human_message().contains("Resolve the share link again"));
    }

    #[test]
    fn test_transfer_error_kinds_without_range() {
        assert_eq!(
            TransferError::unknown_size("u").kind(),
            ErrorKind::UnknownSize
        );
        assert_eq!(
            TransferError::probe_status("u", 500).kind(),
            ErrorKind::ProbeError
        );
        assert_eq!(
            TransferError::invalid_url("ftp://x").kind(),
            ErrorKind::InvalidUrl
        );
        assert_eq!(
            TransferError::cancelled("/tmp/x").kind(),
            ErrorKind::Cancelled
        );
        assert!(TransferError::unknown_size("u").failed_range().is_none());
    }

    #[test]
    fn test_sink_error_converts_into_transfer_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: TransferError = SinkError::open("/tmp/out.bin", io_error).into();
        assert_eq!(error.kind(), ErrorKind::SinkError);
        assert!(error.to_string().contains("/tmp/out.bin"));
    }

    #[test]
    fn test_probe_403_suggests_relinking() {
        let msg = TransferError::probe_status("https://example.com/f", 403).human_message();
        assert!(msg.contains("Resolve the share link again"), "got: {msg}");
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(ErrorKind::LinkRejected.to_string(), "LinkRejected");
        assert_eq!(ErrorKind::ChunkError.as_str(), "ChunkError");
    }
}
