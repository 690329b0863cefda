//! URL extraction and validation from free text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use super::error::{MAX_URL_LENGTH, ParseError};

/// Finds `http(s)://` links and bare `www.` hosts up to the next whitespace.
#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https?://|www\.)\S+").expect("URL regex is valid") // Static pattern, safe to panic
});

/// Extracts and validates URLs from text.
///
/// Bare `www.` links get an `https://` prefix. Each candidate is validated on
/// its own, so one bad link does not hide the others.
///
/// # Examples
///
/// ```
/// use rangefetch_core::parser::extract_urls;
///
/// let results = extract_urls("grab www.example.com/a.zip and https://example.org/b.iso");
/// assert_eq!(results.len(), 2);
/// assert_eq!(results[0].as_deref().ok(), Some("https://www.example.com/a.zip"));
/// ```
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
#[must_use]
pub fn extract_urls(input: &str) -> Vec<Result<String, ParseError>> {
    URL_PATTERN
        .find_iter(input)
        .map(|url_match| {
            let cleaned = clean_url_trailing(url_match.as_str());
            trace!(url = %cleaned, "found URL candidate");
            let candidate = if cleaned.starts_with("www.") {
                format!("https://{cleaned}")
            } else {
                cleaned.to_string()
            };
            let validated = validate_url(&candidate);
            match &validated {
                Ok(url) => debug!(url = %url, "URL validated"),
                Err(e) => debug!(url = %candidate, error = %e, "URL validation failed"),
            }
            validated
        })
        .collect()
}

/// Strips sentence punctuation and unbalanced closing brackets.
fn clean_url_trailing(url: &str) -> &str {
    let mut result = url;

    while let Some(last) = result.chars().last() {
        match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '"' | '\'' | '>' => {
                result = &result[..result.len() - 1];
            }
            ')' | ']' => {
                let open = if last == ')' { '(' } else { '[' };
                let open_count = result.chars().filter(|&c| c == open).count();
                let close_count = result.chars().filter(|&c| c == last).count();
                if close_count > open_count {
                    result = &result[..result.len() - 1];
                } else {
                    break;
                }
            }
            _ => break,
        }
    }

    result
}

/// Validates a URL string and normalizes it.
///
/// # Validation rules:
/// - Must not exceed `MAX_URL_LENGTH` (2000 chars)
/// - Must be parseable by the `url` crate
/// - Must use http or https scheme
/// - Must have a host
pub(crate) fn validate_url(raw: &str) -> Result<String, ParseError> {
    if raw.len() > MAX_URL_LENGTH {
        return Err(ParseError::too_long(raw));
    }

    let parsed = Url::parse(raw).map_err(|e| ParseError::malformed(raw, &e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(ParseError::unsupported_scheme(raw, scheme)),
    }

    if parsed.host().is_none() {
        return Err(ParseError::no_host(raw));
    }

    Ok(parsed.to_string())
}
