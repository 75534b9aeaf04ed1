//! Source resolver port.
//!
//! Abstracts the metadata/search provider that maps a content key to a
//! fetchable source locator. The engine treats it as a black box that may
//! fail or time out; a failure surfaces as a `Failed` job, never a fault.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::acquire::{AcquireError, ArtifactMeta, ContentKey};

/// A resolved download source for a content key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSource {
    /// Locator the downloader is pointed at.
    pub url: String,
    /// Descriptive metadata from the provider. Fills gaps in caller-supplied
    /// metadata; never overrides it.
    pub metadata: ArtifactMeta,
}

impl ResolvedSource {
    /// Create a resolved source.
    pub fn new(url: impl Into<String>, metadata: ArtifactMeta) -> Self {
        Self {
            url: url.into(),
            metadata,
        }
    }
}

/// Port for resolving a content key to a download source.
#[async_trait]
pub trait SourceResolverPort: Send + Sync {
    /// Resolve the source locator and descriptive metadata for `key`.
    ///
    /// Implementations should map provider failures and timeouts to
    /// `AcquireError::Resolution` with a reason a human can act on.
    async fn resolve_source(&self, key: &ContentKey) -> Result<ResolvedSource, AcquireError>;
}
