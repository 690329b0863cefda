//! Single-range fetching with bounded retry.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use tracing::{debug, instrument, warn};

use super::client::{HttpClient, declared_content_length};
use super::constants::MAX_PREALLOCATED_PAYLOAD;
use super::error::FetchError;
use super::range::ChunkRange;
use super::retry::{RetryDecision, RetryPolicy, classify_error};

/// Bytes of one fetched range.
///
/// `payload.len()` always equals `range.length()` for results returned by
/// [`RangeFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    /// The range these bytes belong to.
    pub range: ChunkRange,
    /// The range body.
    pub payload: Vec<u8>,
}

/// Fetches byte ranges, retrying transient failures per [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RangeFetcher {
    client: HttpClient,
    retry_policy: RetryPolicy,
}

impl RangeFetcher {
    /// Creates a fetcher over a shared client.
    #[must_use]
    pub fn new(client: HttpClient, retry_policy: RetryPolicy) -> Self {
        Self {
            client,
            retry_policy,
        }
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Fetches `range`, retrying connection, read, short-body and 5xx failures.
    ///
    /// Sleeps `attempt * backoff_step` between attempts only. A 403 returns
    /// [`FetchError::LinkRejected`] after the first attempt.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Exhausted`] when more than one attempt was made, or the
    ///   only attempt failed with a retryable error
    /// - the non-retryable error of a single attempt otherwise
    #[instrument(skip(self, headers), fields(url = %url, range = %range))]
    pub async fn fetch_with_retry(
        &self,
        url: &str,
        headers: &HeaderMap,
        range: ChunkRange,
    ) -> Result<ChunkResult, FetchError> {
        let mut attempt: u32 = 1;

        loop {
            match self.fetch_once(url, headers, range).await {
                Ok(chunk) => {
                    if attempt > 1 {
                        debug!(attempt, "range succeeded after retry");
                    }
                    return Ok(chunk);
                }
                Err(error) => {
                    let delay = self.after_failure(range, attempt, error)?;
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Decides what follows failed attempt number `attempt` of `range`.
    ///
    /// Returns the backoff to sleep before the next attempt, or the error to
    /// report. Once more than one attempt was made the error carries the
    /// attempt count.
    pub(crate) fn after_failure(
        &self,
        range: ChunkRange,
        attempt: u32,
        error: FetchError,
    ) -> Result<Duration, FetchError> {
        let failure_type = classify_error(&error);
        match self.retry_policy.should_retry(failure_type, attempt) {
            RetryDecision::Retry { delay, .. } => {
                warn!(
                    attempt,
                    max_attempts = self.retry_policy.max_attempts(),
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "range attempt failed, retrying"
                );
                Ok(delay)
            }
            RetryDecision::DoNotRetry { reason } => {
                debug!(attempt, reason = %reason, "not retrying range");
                if attempt > 1 || failure_type.is_retryable() {
                    Err(FetchError::exhausted(range, attempt, error))
                } else {
                    Err(error)
                }
            }
        }
    }

    /// Makes one attempt at `range` and validates the body length.
    ///
    /// A `206` body must be exactly `range.length()` bytes. A `200` means the
    /// server sent the whole entity; it is accepted only when that entity is
    /// exactly the requested range, otherwise [`FetchError::RangeIgnored`].
    ///
    /// # Errors
    ///
    /// Any single-attempt [`FetchError`].
    pub async fn fetch_once(
        &self,
        url: &str,
        headers: &HeaderMap,
        range: ChunkRange,
    ) -> Result<ChunkResult, FetchError> {
        let mut body = self.open_range(url, headers, range).await?;

        let capacity = usize::try_from(range.length().min(MAX_PREALLOCATED_PAYLOAD)).unwrap_or(0);
        let mut payload = Vec::with_capacity(capacity);
        while let Some(piece) = body.next_piece().await? {
            payload.extend_from_slice(&piece);
        }

        Ok(ChunkResult { range, payload })
    }

    /// Sends the request for `range` without reading the body.
    ///
    /// The body is then read piece by piece through [`RangeBody`], so large
    /// ranges can be written out as they arrive.
    pub(crate) async fn open_range(
        &self,
        url: &str,
        headers: &HeaderMap,
        range: ChunkRange,
    ) -> Result<RangeBody, FetchError> {
        let response = self.client.send_range(url, headers, range).await?;
        let partial = response.status() == StatusCode::PARTIAL_CONTENT;

        if !partial
            && declared_content_length(&response).is_some_and(|declared| declared != range.length())
        {
            return Err(FetchError::range_ignored(url, range));
        }

        Ok(RangeBody {
            url: url.to_string(),
            range,
            partial,
            received: 0,
            response,
        })
    }
}

/// Body of one range response, checked against the range length as it is read.
#[derive(Debug)]
pub(crate) struct RangeBody {
    url: String,
    range: ChunkRange,
    partial: bool,
    received: u64,
    response: Response,
}

impl RangeBody {
    /// Next piece of the body, or `None` once exactly `range.length()` bytes
    /// were read.
    ///
    /// Overflow of a `206` body and a short body are
    /// [`FetchError::PayloadLengthMismatch`]; overflow of a `200` body means
    /// the server sent more than the range, [`FetchError::RangeIgnored`].
    pub(crate) async fn next_piece(&mut self) -> Result<Option<Bytes>, FetchError> {
        let expected = self.range.length();
        let piece = self
            .response
            .chunk()
            .await
            .map_err(|e| FetchError::read(self.url.clone(), self.range, e))?;

        let Some(piece) = piece else {
            if self.received != expected {
                return Err(FetchError::payload_length_mismatch(self.range, self.received));
            }
            return Ok(None);
        };

        self.received += piece.len() as u64;
        if self.received > expected {
            if self.partial {
                return Err(FetchError::payload_length_mismatch(self.range, self.received));
            }
            return Err(FetchError::range_ignored(self.url.clone(), self.range));
        }
        Ok(Some(piece))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::download::ErrorKind;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_fetcher(max_attempts: u32) -> RangeFetcher {
        RangeFetcher::new(
            HttpClient::new(),
            RetryPolicy::new(max_attempts, Duration::from_millis(5)),
        )
    }

    #[tokio::test]
    async fn test_fetch_once_accepts_exact_partial_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file.bin"))
            .and(header("Range", "bytes=10-19"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(b"0123456789".to_vec()))
            .mount(&mock_server)
            .await;

        let url = format!("{}/file.bin", mock_server.uri());
        let range = ChunkRange::new(10, 19).unwrap();
        let chunk = fast_fetcher(1)
            .fetch_once(&url, &HeaderMap::new(), range)
            .await
            .unwrap();

        assert_eq!(chunk.range, range);
        assert_eq!(chunk.payload, b"0123456789");
    }

    #[tokio::test]
    async fn test_fetch_once_short_body_is_length_mismatch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/short.bin"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(b"012345678".to_vec()))
            .mount(&mock_server)
            .await;

        let url = format!("{}/short.bin", mock_server.uri());
        let error = fast_fetcher(1)
            .fetch_once(&url, &HeaderMap::new(), ChunkRange::new(0, 9).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            FetchError::PayloadLengthMismatch {
                expected: 10,
                actual: 9,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_once_full_body_for_partial_range_is_range_ignored() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/norange.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 30]))
            .mount(&mock_server)
            .await;

        let url = format!("{}/norange.bin", mock_server.uri());
        let error = fast_fetcher(1)
            .fetch_once(&url, &HeaderMap::new(), ChunkRange::new(0, 9).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::RangeIgnored { .. }));
    }

    #[tokio::test]
    async fn test_fetch_once_full_body_matching_whole_range_is_accepted() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/small.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 30]))
            .mount(&mock_server)
            .await;

        let url = format!("{}/small.bin", mock_server.uri());
        let chunk = fast_fetcher(1)
            .fetch_once(&url, &HeaderMap::new(), ChunkRange::whole(30).unwrap())
            .await
            .unwrap();

        assert_eq!(chunk.payload.len(), 30);
    }

    #[tokio::test]
    async fn test_fetch_with_retry_recovers_from_transient_errors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky.bin"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky.bin"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![1u8; 10]))
            .with_priority(2)
            .mount(&mock_server)
            .await;

        let url = format!("{}/flaky.bin", mock_server.uri());
        let chunk = fast_fetcher(5)
            .fetch_with_retry(&url, &HeaderMap::new(), ChunkRange::new(0, 9).unwrap())
            .await
            .unwrap();

        assert_eq!(chunk.payload.len(), 10);
        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_with_retry_stops_after_five_attempts() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down.bin"))
            .respond_with(ResponseTemplate::new(500))
            .expect(5)
            .mount(&mock_server)
            .await;

        let url = format!("{}/down.bin", mock_server.uri());
        let range = ChunkRange::new(0, 9).unwrap();
        let error = fast_fetcher(5)
            .fetch_with_retry(&url, &HeaderMap::new(), range)
            .await
            .unwrap_err();

        match &error {
            FetchError::Exhausted {
                range: failed,
                attempts,
                last,
            } => {
                assert_eq!(*failed, range);
                assert_eq!(*attempts, 5);
                assert!(matches!(**last, FetchError::HttpStatus { status: 500, .. }));
            }
            other => panic!("Expected Exhausted, got: {other:?}"),
        }
        assert_eq!(error.kind(), ErrorKind::ProtocolError);
    }

    #[tokio::test]
    async fn test_fetch_with_retry_link_rejected_makes_one_attempt() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/expired.bin"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/expired.bin", mock_server.uri());
        let error = fast_fetcher(5)
            .fetch_with_retry(&url, &HeaderMap::new(), ChunkRange::new(0, 9).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::LinkRejected { .. }));
        assert_eq!(error.attempts(), 1);
    }

    #[tokio::test]
    async fn test_fetch_with_retry_link_rejected_after_retry_keeps_attempt_count() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/revoked.bin"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/revoked.bin"))
            .respond_with(ResponseTemplate::new(403))
            .with_priority(2)
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/revoked.bin", mock_server.uri());
        let error = fast_fetcher(5)
            .fetch_with_retry(&url, &HeaderMap::new(), ChunkRange::new(0, 9).unwrap())
            .await
            .unwrap_err();

        assert_eq!(error.attempts(), 2);
        assert_eq!(error.kind(), ErrorKind::LinkRejected);
        assert!(matches!(error.root(), FetchError::LinkRejected { .. }));
    }

    #[tokio::test]
    async fn test_fetch_with_retry_does_not_retry_404() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.bin"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/missing.bin", mock_server.uri());
        let error = fast_fetcher(5)
            .fetch_with_retry(&url, &HeaderMap::new(), ChunkRange::new(0, 9).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_with_retry_retries_short_payload() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/truncated.bin"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![1u8; 9]))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/truncated.bin"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![2u8; 10]))
            .with_priority(2)
            .mount(&mock_server)
            .await;

        let url = format!("{}/truncated.bin", mock_server.uri());
        let chunk = fast_fetcher(5)
            .fetch_with_retry(&url, &HeaderMap::new(), ChunkRange::new(0, 9).unwrap())
            .await
            .unwrap();

        assert_eq!(chunk.payload, vec![2u8; 10]);
    }

    #[tokio::test]
    async fn test_fetch_with_retry_timeout_is_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.bin"))
            .respond_with(
                ResponseTemplate::new(206)
                    .set_body_bytes(vec![1u8; 10])
                    .set_delay(Duration::from_secs(3)),
            )
            .expect(2)
            .mount(&mock_server)
            .await;

        let url = format!("{}/slow.bin", mock_server.uri());
        let fetcher = RangeFetcher::new(
            HttpClient::new_with_timeouts(1, 1),
            RetryPolicy::new(2, Duration::from_millis(5)),
        );
        let error = fetcher
            .fetch_with_retry(&url, &HeaderMap::new(), ChunkRange::new(0, 9).unwrap())
            .await
            .unwrap_err();

        assert_eq!(error.attempts(), 2);
        assert!(matches!(error.root(), FetchError::Timeout { .. }));
    }
}
