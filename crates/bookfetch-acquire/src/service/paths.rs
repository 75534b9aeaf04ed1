//! Destination path planning for acquisitions.
//!
//! Each job downloads into its own directory named after the content key,
//! so concurrent jobs can never write over each other and cleanup is a
//! single directory removal.

use std::path::{Path, PathBuf};

use bookfetch_core::{AcquireError, ContentKey};

/// A planned fetch destination.
#[derive(Debug, Clone)]
pub struct FetchDestination {
    /// Directory the downloader writes into.
    pub dir: PathBuf,
}

impl FetchDestination {
    /// Plan the destination directory for `key`.
    ///
    /// Content keys are validated alphanumerics, so the key is safe to use
    /// as a directory name directly.
    #[must_use]
    pub fn plan(downloads_directory: &Path, key: &ContentKey) -> Self {
        Self {
            dir: downloads_directory.join(key.as_str()),
        }
    }

    /// Ensure the destination directory exists, creating it if necessary.
    pub fn ensure_dir(&self) -> Result<(), AcquireError> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)
                .map_err(|e| AcquireError::io("create_dir", e.to_string()))?;
        }
        Ok(())
    }

    /// Best-effort removal of the destination directory and its contents.
    pub fn discard(&self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    dir = %self.dir.display(),
                    error = %e,
                    "Failed to remove download directory"
                );
            }
        }
    }
}
