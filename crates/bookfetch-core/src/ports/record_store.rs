//! Persistent record store port.
//!
//! The engine's only durable write: committing a finished artifact plus its
//! metadata as one record with file attachments. The commit is all-or-nothing
//! from the engine's perspective; a partial write must be reported as an
//! error, in which case the artifact is not considered stored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::acquire::{AcquireError, ArtifactMeta};

/// A file attached to a record commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedFile {
    /// Record field the file is attached under (e.g. "book", "cover").
    pub field: String,
    /// Local path of the file to attach.
    pub path: PathBuf,
}

impl AttachedFile {
    /// Create an attachment.
    pub fn new(field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            field: field.into(),
            path: path.into(),
        }
    }
}

/// A record as stored by the record store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Store-assigned record identifier.
    pub id: String,
}

impl StoredRecord {
    /// Create a stored record handle.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Port for committing artifacts into the persistent record store.
#[async_trait]
pub trait RecordStorePort: Send + Sync {
    /// Durably write `metadata` plus the attached `files` as one record.
    ///
    /// `files` are ordered: the primary artifact comes first, auxiliary
    /// files (e.g. a cover thumbnail) after. Implementations must either
    /// store everything or fail with `AcquireError::Commit`.
    async fn commit(
        &self,
        metadata: &ArtifactMeta,
        files: &[AttachedFile],
    ) -> Result<StoredRecord, AcquireError>;
}
