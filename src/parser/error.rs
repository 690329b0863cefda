//! Error types for input parsing operations.

use std::path::PathBuf;

use thiserror::Error;

/// Maximum URL length to accept (standard browser limit).
pub const MAX_URL_LENGTH: usize = 2000;

/// Errors that can occur while reading transfer inputs.
#[derive(Debug, Error)]
pub enum ParseError {
    /// URL is malformed or uses unsupported scheme
    #[error("invalid URL '{url}': {reason}\n  Suggestion: {suggestion}")]
    InvalidUrl {
        /// The URL that failed validation
        url: String,
        /// Why the URL is invalid
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// URL exceeds maximum allowed length
    #[error(
        "URL too long ({length} chars, max {max}): {url_preview}...\n  Suggestion: Check the input for pasted text around the link"
    )]
    UrlTooLong {
        /// Truncated URL for display
        url_preview: String,
        /// Actual length
        length: usize,
        /// Maximum allowed
        max: usize,
    },

    /// A resolved-file manifest could not be read.
    #[error("cannot read manifest {path}: {source}")]
    ManifestIo {
        /// Manifest path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A resolved-file manifest is not valid JSON of the expected shape.
    #[error(
        "invalid manifest {path}: {source}\n  Suggestion: Provide a JSON list of {{\"name\", \"size\", \"url\"}} records"
    )]
    ManifestFormat {
        /// Manifest path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl ParseError {
    /// Creates an `InvalidUrl` error for a non-web URL scheme.
    #[must_use]
    pub fn unsupported_scheme(url: &str, scheme: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: format!("scheme '{scheme}' is not supported"),
            suggestion: "Use http:// or https:// URLs".to_string(),
        }
    }

    /// Creates an `InvalidUrl` error for a malformed URL.
    #[must_use]
    pub fn malformed(url: &str, parse_error: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: parse_error.to_string(),
            suggestion: "Check the URL format and try again".to_string(),
        }
    }

    /// Creates an `InvalidUrl` error for a URL without a host.
    #[must_use]
    pub fn no_host(url: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: "URL has no host".to_string(),
            suggestion: "Ensure the URL includes a domain (e.g., example.com)".to_string(),
        }
    }

    /// Creates a `UrlTooLong` error for URLs exceeding the maximum length.
    #[must_use]
    pub fn too_long(url: &str) -> Self {
        Self::UrlTooLong {
            url_preview: url.chars().take(50).collect(),
            length: url.len(),
            max: MAX_URL_LENGTH,
        }
    }

    /// Creates a manifest read error.
    pub fn manifest_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ManifestIo {
            path: path.into(),
            source,
        }
    }

    /// Creates a manifest format error.
    pub fn manifest_format(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::ManifestFormat {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_display_has_suggestion() {
        let msg = ParseError::unsupported_scheme("ftp://x/y", "ftp").to_string();
        assert!(msg.contains("scheme 'ftp'"), "got: {msg}");
        assert!(msg.contains("Suggestion:"), "got: {msg}");
    }

    #[test]
    fn test_too_long_truncates_preview() {
        let url = format!("https://example.com/{}", "a".repeat(3000));
        match ParseError::too_long(&url) {
            ParseError::UrlTooLong {
                url_preview,
                length,
                max,
            } => {
                assert_eq!(url_preview.chars().count(), 50);
                assert_eq!(length, url.len());
                assert_eq!(max, MAX_URL_LENGTH);
            }
            other => panic!("Expected UrlTooLong, got: {other:?}"),
        }
    }
}
