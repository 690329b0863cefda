//! Shared helpers for integration tests: a byte-range mock server and
//! progress sinks for recording samples or raising the interrupt flag.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rangefetch_core::{ProgressSample, ProgressSink};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Deterministic test payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Serves `Range: bytes=a-b` requests from an in-memory body.
///
/// Requests without a `Range` header get the whole body with status 200.
/// Every received `Range` value is recorded in order.
pub struct RangeResponder {
    body: Vec<u8>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl RangeResponder {
    pub fn new(body: Vec<u8>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                body,
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Some(raw) = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
        else {
            return ResponseTemplate::new(200).set_body_bytes(self.body.clone());
        };
        self.seen.lock().unwrap().push(raw.clone());

        let Some((start, end)) = raw
            .strip_prefix("bytes=")
            .and_then(|spec| spec.split_once('-'))
            .and_then(|(s, e)| Some((s.parse::<usize>().ok()?, e.parse::<usize>().ok()?)))
        else {
            return ResponseTemplate::new(416);
        };
        if start > end || end >= self.body.len() {
            return ResponseTemplate::new(416);
        }

        ResponseTemplate::new(206)
            .insert_header(
                "Content-Range",
                format!("bytes {start}-{end}/{}", self.body.len()).as_str(),
            )
            .set_body_bytes(self.body[start..=end].to_vec())
    }
}

/// Mounts a HEAD responder advertising `len` bytes with `Accept-Ranges: bytes`.
pub async fn mount_probe(server: &MockServer, len: usize) {
    Mock::given(method("HEAD"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Accept-Ranges", "bytes")
                .set_body_bytes(vec![0u8; len]),
        )
        .mount(server)
        .await;
}

/// Progress sink that keeps every delivered sample.
#[derive(Default)]
pub struct RecordingProgress {
    samples: Mutex<Vec<ProgressSample>>,
}

impl RecordingProgress {
    pub fn samples(&self) -> Vec<ProgressSample> {
        self.samples.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn on_progress(&self, sample: &ProgressSample) {
        self.samples.lock().unwrap().push(sample.clone());
    }
}

/// Progress sink that raises an interrupt flag on the first sample it sees.
pub struct InterruptOnProgress {
    flag: Arc<AtomicBool>,
}

impl InterruptOnProgress {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }
}

#[async_trait]
impl ProgressSink for InterruptOnProgress {
    async fn on_progress(&self, _sample: &ProgressSample) {
        self.flag.store(true, Ordering::SeqCst);
    }
}
