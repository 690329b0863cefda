//! Input parsing: URLs from free text and resolver manifests.
//!
//! # Example
//!
//! ```
//! use rangefetch_core::parser::extract_urls;
//!
//! let results = extract_urls("Check out https://example.com/video.mp4");
//! assert_eq!(results.len(), 1);
//! assert!(results[0].is_ok());
//! ```

mod error;
mod resolved;
mod url;

pub use error::{MAX_URL_LENGTH, ParseError};
pub use resolved::{ResolvedFile, load_manifest};
pub use url::extract_urls;
