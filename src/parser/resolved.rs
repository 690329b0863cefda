//! Records produced by the link resolver.
//!
//! A resolver turns a share link into a direct download URL plus display
//! metadata. Only `download_url` is fetched; `name` picks the destination
//! file name and `size` is advisory (the probe is authoritative).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ParseError;
use super::url::validate_url;

/// One resolved file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFile {
    /// Display name, used as the destination file name.
    pub name: String,
    /// Advisory size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Direct download URL.
    #[serde(rename = "url", alias = "download_url")]
    pub download_url: String,
    /// Optional preview image URL.
    #[serde(
        default,
        rename = "thumbnailUrl",
        alias = "thumbnail_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub thumbnail_url: Option<String>,
}

impl ResolvedFile {
    /// Wraps a bare URL with no resolver metadata.
    #[must_use]
    pub fn from_url(download_url: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            size: 0,
            download_url: download_url.into(),
            thumbnail_url: None,
        }
    }

    /// The resolved name, if the resolver supplied a non-blank one.
    #[must_use]
    pub fn preferred_name(&self) -> Option<&str> {
        let trimmed = self.name.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Reads a JSON list of [`ResolvedFile`] records.
///
/// A single object is accepted as a list of one. Each `download_url` must be
/// a valid http(s) URL.
///
/// # Errors
///
/// - [`ParseError::ManifestIo`] when the file cannot be read
/// - [`ParseError::ManifestFormat`] when the JSON does not match
/// - [`ParseError::InvalidUrl`] for the first record with a bad URL
pub fn load_manifest(path: &Path) -> Result<Vec<ResolvedFile>, ParseError> {
    let raw = std::fs::read(path).map_err(|e| ParseError::manifest_io(path, e))?;
    let files = parse_manifest(&raw).map_err(|e| ParseError::manifest_format(path, e))?;

    files
        .into_iter()
        .map(|mut file| {
            file.download_url = validate_url(file.download_url.trim())?;
            Ok(file)
        })
        .collect::<Result<Vec<_>, _>>()
        .inspect(|files| debug!(path = %path.display(), count = files.len(), "manifest loaded"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestShape {
    Many(Vec<ResolvedFile>),
    One(ResolvedFile),
}

fn parse_manifest(raw: &[u8]) -> Result<Vec<ResolvedFile>, serde_json::Error> {
    Ok(match serde_json::from_slice::<ManifestShape>(raw)? {
        ManifestShape::Many(files) => files,
        ManifestShape::One(file) => vec![file],
    })
}
