//! Resume manifest stored next to a partial destination.
//!
//! The manifest is a small JSON file at `<destination>.resume.json` that
//! records how many leading bytes of the destination are committed. It is
//! only trusted when the source size and chunk size match the current run
//! and the destination is at least that long.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Suffix appended to the destination file name.
const MANIFEST_SUFFIX: &str = ".resume.json";

/// Progress record for a resumable transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeManifest {
    /// Total size reported by the probe.
    pub source_size: u64,
    /// Chunk size used to plan ranges.
    pub chunk_size: u64,
    /// Leading bytes of the destination known to be written and flushed.
    pub committed_bytes: u64,
}

impl ResumeManifest {
    /// Path of the manifest belonging to `destination`.
    #[must_use]
    pub fn path_for(destination: &Path) -> PathBuf {
        let mut name = destination.as_os_str().to_os_string();
        name.push(MANIFEST_SUFFIX);
        PathBuf::from(name)
    }

    /// Offset to resume from, or 0 when the stored manifest does not apply.
    ///
    /// Unreadable or malformed manifests are treated as absent.
    pub async fn resume_offset(destination: &Path, source_size: u64, chunk_size: u64) -> u64 {
        let manifest_path = Self::path_for(destination);
        let Ok(raw) = tokio::fs::read(&manifest_path).await else {
            return 0;
        };
        let manifest: Self = match serde_json::from_slice(&raw) {
            Ok(manifest) => manifest,
            Err(error) => {
                warn!(path = %manifest_path.display(), error = %error, "ignoring malformed resume manifest");
                return 0;
            }
        };

        if manifest.source_size != source_size || manifest.chunk_size != chunk_size {
            debug!(?manifest, source_size, chunk_size, "resume manifest does not match source");
            return 0;
        }
        if manifest.committed_bytes >= source_size {
            return 0;
        }

        let on_disk = tokio::fs::metadata(destination)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if on_disk < manifest.committed_bytes {
            debug!(on_disk, committed = manifest.committed_bytes, "destination shorter than manifest");
            return 0;
        }

        manifest.committed_bytes
    }

    /// Writes the manifest atomically (temporary file, then rename).
    ///
    /// # Errors
    ///
    /// Returns the IO error of the write or rename.
    pub async fn store(&self, destination: &Path) -> std::io::Result<()> {
        let manifest_path = Self::path_for(destination);
        let mut tmp_name = manifest_path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let body = serde_json::to_vec(self).map_err(std::io::Error::other)?;
        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &manifest_path).await
    }

    /// Deletes the manifest of `destination` if present.
    pub async fn remove(destination: &Path) {
        let manifest_path = Self::path_for(destination);
        match tokio::fs::remove_file(&manifest_path).await {
            Ok(()) => debug!(path = %manifest_path.display(), "resume manifest removed"),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                warn!(path = %manifest_path.display(), error = %error, "failed to remove resume manifest");
            }
        }
    }
}
