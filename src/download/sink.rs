//! Destination file writer.
//!
//! [`SinkWriter`] owns the destination handle for one transfer. Every
//! [`SinkWriter::write`] is flushed before it returns, so bytes reported as
//! committed survive the writer being dropped on an error or cancellation
//! path. [`SinkWriter::close`] additionally syncs the file to disk.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

use super::error::SinkError;

/// Sequential writer for a transfer destination.
#[derive(Debug)]
pub struct SinkWriter {
    path: PathBuf,
    file: File,
    position: u64,
}

impl SinkWriter {
    /// Opens `path` for writing without truncating it.
    ///
    /// When the first open fails, the parent directory tree is created and
    /// the open is retried exactly once.
    ///
    /// # Errors
    ///
    /// - [`SinkError::CreateDir`] when the parent directory cannot be created
    /// - [`SinkError::Open`] when the retried open fails as well
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let file = match open_for_write(&path).await {
            Ok(file) => file,
            Err(first_error) => {
                debug!(path = %path.display(), error = %first_error, "open failed, creating parent directory");
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| SinkError::create_dir(parent, e))?;
                }
                open_for_write(&path)
                    .await
                    .map_err(|e| SinkError::open(path.clone(), e))?
            }
        };

        Ok(Self {
            path,
            file,
            position: 0,
        })
    }

    /// Truncates the file to `offset` bytes and positions the cursor there.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Write`] when truncation or seeking fails.
    pub async fn reset_to(&mut self, offset: u64) -> Result<(), SinkError> {
        self.file
            .set_len(offset)
            .await
            .map_err(|e| SinkError::write(self.path.clone(), e))?;
        self.file
            .seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| SinkError::write(self.path.clone(), e))?;
        self.position = offset;
        Ok(())
    }

    /// Appends `bytes` at the current position and flushes them.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Write`] when writing or flushing fails.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.file
            .write_all(bytes)
            .await
            .map_err(|e| SinkError::write(self.path.clone(), e))?;
        self.file
            .flush()
            .await
            .map_err(|e| SinkError::write(self.path.clone(), e))?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    /// Bytes committed so far, including any resumed prefix.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes, syncs and releases the handle, returning the final length.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Close`] when flushing or syncing fails.
    pub async fn close(mut self) -> Result<u64, SinkError> {
        self.file
            .flush()
            .await
            .map_err(|e| SinkError::close(self.path.clone(), e))?;
        self.file
            .sync_all()
            .await
            .map_err(|e| SinkError::close(self.path.clone(), e))?;
        debug!(path = %self.path.display(), bytes = self.position, "sink closed");
        Ok(self.position)
    }
}

async fn open_for_write(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .await
}
