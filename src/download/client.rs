//! HTTP client wrapper for size probes and range requests.
//!
//! This module provides the `HttpClient` struct which owns the connection
//! pool, timeout configuration and status-code mapping shared by the probe and
//! every range attempt.

use std::time::Duration;

use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, HeaderMap, RANGE};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument};

use super::constants::{ATTEMPT_TIMEOUT_SECS, CONNECT_TIMEOUT_SECS};
use super::error::{FetchError, TransferError};
use super::range::ChunkRange;
use crate::user_agent;

/// Result of the metadata probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferMetadata {
    /// Authoritative resource size in bytes; always greater than zero.
    pub total_size: u64,
    /// Whether the server advertised `Accept-Ranges: bytes`.
    pub accepts_ranges: bool,
}

/// HTTP client for probes and range requests.
///
/// Created once and cloned freely; clones share the connection pool.
///
/// # Example
///
/// ```no_run
/// use rangefetch_core::download::HttpClient;
/// use reqwest::header::HeaderMap;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let metadata = client.probe("https://example.com/file.bin", &HeaderMap::new()).await?;
/// println!("size: {}", metadata.total_size);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Per-attempt timeout: 2 minutes (covers the whole range body)
    /// - Redirects followed
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, ATTEMPT_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, attempt_timeout_secs: u64) -> Self {
        Self::with_timeouts(
            Duration::from_secs(connect_timeout_secs),
            Duration::from_secs(attempt_timeout_secs),
        )
        .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a new HTTP client, surfacing builder failures.
    ///
    /// # Errors
    ///
    /// Returns the builder error when TLS or system configuration cannot be loaded.
    pub fn with_timeouts(
        connect_timeout: Duration,
        attempt_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(attempt_timeout)
            .user_agent(user_agent::default_transfer_user_agent())
            .build()?;
        Ok(Self { client })
    }

    /// Issues a `HEAD` request to learn the total resource size.
    ///
    /// # Errors
    ///
    /// - [`TransferError::ProbeNetwork`] when the request cannot be sent
    /// - [`TransferError::ProbeStatus`] for any non-2xx status
    /// - [`TransferError::UnknownSize`] when `Content-Length` is missing or zero
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn probe(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<TransferMetadata, TransferError> {
        let response = self
            .client
            .head(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| TransferError::probe_network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::probe_status(url, status.as_u16()));
        }

        // HEAD responses carry no body, so the header is read directly.
        let total_size = declared_content_length(&response).unwrap_or(0);
        if total_size == 0 {
            return Err(TransferError::unknown_size(url));
        }

        let accepts_ranges = response
            .headers()
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("bytes"));

        debug!(total_size, accepts_ranges, "probe complete");
        Ok(TransferMetadata {
            total_size,
            accepts_ranges,
        })
    }

    /// Sends a `GET` for `range`, keeping every caller header except `Range`.
    ///
    /// Only the status is checked here; body length validation belongs to the
    /// fetcher that streams the payload.
    pub(crate) async fn send_range(
        &self,
        url: &str,
        headers: &HeaderMap,
        range: ChunkRange,
    ) -> Result<Response, FetchError> {
        let mut request_headers = headers.clone();
        request_headers.remove(RANGE);

        let response = self
            .client
            .get(url)
            .headers(request_headers)
            .header(RANGE, range.header_value())
            .send()
            .await
            .map_err(|e| FetchError::connection(url, range, e))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(FetchError::link_rejected(url, status.as_u16()));
        }
        if !status.is_success() {
            return Err(FetchError::http_status(url, range, status.as_u16()));
        }

        Ok(response)
    }
}

/// Parses the `Content-Length` header of a response.
pub(crate) fn declared_content_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}
