//! Destination file naming.
//!
//! Names come from the resolved file name when one is known, otherwise from
//! the last path segment of the source URL. Either way the result is a single
//! safe path segment, so it can never escape the output directory.

use std::path::{Component, Path, PathBuf};

use url::Url;

/// Name used when neither the resolved name nor the URL yields one.
pub const FALLBACK_FILENAME: &str = "download.bin";

/// Picks the destination file name for a transfer.
///
/// Tries `preferred` first, then the percent-decoded last segment of
/// `source_url`, then [`FALLBACK_FILENAME`].
#[must_use]
pub fn destination_filename(preferred: Option<&str>, source_url: &str) -> String {
    preferred
        .and_then(usable_filename)
        .or_else(|| filename_from_url(source_url))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Joins the chosen file name onto `output_dir`.
#[must_use]
pub fn destination_path(output_dir: &Path, preferred: Option<&str>, source_url: &str) -> PathBuf {
    output_dir.join(destination_filename(preferred, source_url))
}

/// Replaces characters that are invalid on common filesystems.
///
/// `/ \ : * ? " < > |` and control characters become `_`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn usable_filename(name: &str) -> Option<String> {
    let sanitized = sanitize_filename(name);
    (!sanitized.trim_matches('_').is_empty() && is_safe_filename_segment(&sanitized))
        .then_some(sanitized)
}

fn filename_from_url(source_url: &str) -> Option<String> {
    let parsed = Url::parse(source_url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
    usable_filename(&decoded)
}

fn is_safe_filename_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_removes_invalid_chars() {
        assert_eq!(sanitize_filename("file/name.mkv"), "file_name.mkv");
        assert_eq!(sanitize_filename("file\\name.mkv"), "file_name.mkv");
        assert_eq!(sanitize_filename("a:b*c?d.zip"), "a_b_c_d.zip");
        assert_eq!(sanitize_filename("file<name>.pdf"), "file_name_.pdf");
        assert_eq!(sanitize_filename("tab\there.txt"), "tab_here.txt");
    }

    #[test]
    fn test_sanitize_filename_preserves_valid_chars() {
        assert_eq!(sanitize_filename("Movie (2024) [1080p].mkv"), "Movie (2024) [1080p].mkv");
        assert_eq!(sanitize_filename("日本語.pdf"), "日本語.pdf");
    }

    #[test]
    fn test_destination_filename_prefers_resolved_name() {
        assert_eq!(
            destination_filename(Some("holiday.mp4"), "https://cdn.example.com/d/abc123"),
            "holiday.mp4"
        );
    }

    #[test]
    fn test_destination_filename_rejects_dot_segments() {
        assert_eq!(
            destination_filename(Some(".."), "https://cdn.example.com/files/report.pdf"),
            "report.pdf"
        );
        assert_eq!(
            destination_filename(Some("."), "https://cdn.example.com/"),
            FALLBACK_FILENAME
        );
    }

    #[test]
    fn test_destination_filename_decodes_url_segment() {
        assert_eq!(
            destination_filename(None, "https://cdn.example.com/files/my%20file.zip?token=1"),
            "my file.zip"
        );
    }

    #[test]
    fn test_destination_filename_encoded_separator_stays_in_one_segment() {
        assert_eq!(
            destination_filename(None, "https://cdn.example.com/files/..%2F..%2Fetc%2Fpasswd"),
            ".._.._etc_passwd"
        );
    }

    #[test]
    fn test_destination_filename_falls_back() {
        assert_eq!(
            destination_filename(None, "https://cdn.example.com/"),
            FALLBACK_FILENAME
        );
        assert_eq!(destination_filename(Some("  "), "not a url"), FALLBACK_FILENAME);
    }

    #[test]
    fn test_destination_path_joins_output_dir() {
        let path = destination_path(
            Path::new("/tmp/downloads"),
            None,
            "https://cdn.example.com/a/b/video.mp4",
        );
        assert_eq!(path, PathBuf::from("/tmp/downloads/video.mp4"));
    }
}
