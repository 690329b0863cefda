//! rangefetch core library
//!
//! Resumable, chunked HTTP file transfers: size probe, fixed-size byte
//! ranges with independent retry, in-order writes to a local file and
//! rate-limited progress reporting.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - transfer engine, range fetcher, sink and progress throttle
//! - [`parser`] - URLs from free text and resolver manifests

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod parser;
mod size;
mod user_agent;

// Re-export commonly used types
pub use download::{
    ChunkRange, ChunkedTransfer, ErrorKind, HttpClient, NoopProgress, ProgressSample,
    ProgressSink, RetryPolicy, TransferError, TransferOptions, TransferReport, TransferRequest,
};
pub use parser::{ParseError, ResolvedFile, extract_urls, load_manifest};
pub use size::format_size;
