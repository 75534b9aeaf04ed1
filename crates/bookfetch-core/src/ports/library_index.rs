//! Local library index port.
//!
//! A read-only lookup over the on-disk library used to short-circuit
//! acquisition requests for artifacts that are already present.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::acquire::{ArtifactMeta, ContentKey};

/// A record found in the local library index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LibraryRecord {
    /// Identifier of the stored record.
    pub id: String,
    /// Metadata recorded at commit time.
    pub metadata: ArtifactMeta,
}

/// Port for querying the local library index.
#[async_trait]
pub trait LibraryIndexPort: Send + Sync {
    /// Look up `key` in the local index.
    ///
    /// Returns `None` on a miss **and** on index failure: the index is an
    /// optimization for skipping network work, never a gate, so a broken
    /// index degrades to "not present" rather than blocking acquisition.
    async fn lookup(&self, key: &ContentKey) -> Option<LibraryRecord>;
}
