//! Core domain types for acquisitions.
//!
//! Pure data types with no I/O dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::AcquireError;

/// Canonical identifier for a content artifact.
///
/// A stable content hash (e.g. an MD5 of the artifact) naming exactly one
/// acquirable artifact. Keys are normalized to lowercase so lookups are
/// case-insensitive, and validated to be non-empty ASCII alphanumerics.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentKey(String);

impl ContentKey {
    /// Create a validated content key.
    ///
    /// The input is trimmed and lowercased. Returns
    /// `AcquireError::InvalidKey` for empty or non-alphanumeric input.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, AcquireError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AcquireError::invalid_key(raw.as_ref()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Get the normalized key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentKey {
    type Err = AcquireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Descriptive metadata committed alongside an artifact.
///
/// The engine treats these fields as opaque pass-through: whatever the
/// caller supplies is committed verbatim. Fields the caller leaves empty may
/// be filled from the source resolver's metadata via [`ArtifactMeta::merged_over`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Artifact title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Artifact author(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// File format hint (e.g. "epub", "pdf").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Additional caller-defined fields, passed through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ArtifactMeta {
    /// Create empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the format hint.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Add an opaque extra field.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Check whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.format.is_none() && self.extra.is_empty()
    }

    /// Merge with `fallback`, keeping `self`'s fields where present.
    ///
    /// Used to let resolver-supplied metadata fill gaps in caller-supplied
    /// metadata; caller fields always win, including `extra` entries.
    #[must_use]
    pub fn merged_over(&self, fallback: &Self) -> Self {
        let mut extra = fallback.extra.clone();
        for (k, v) in &self.extra {
            extra.insert(k.clone(), v.clone());
        }

        Self {
            title: self.title.clone().or_else(|| fallback.title.clone()),
            author: self.author.clone().or_else(|| fallback.author.clone()),
            format: self.format.clone().or_else(|| fallback.format.clone()),
            extra,
        }
    }
}

/// State of an acquisition job.
///
/// Transitions are strictly forward:
/// `Pending → Running → {Succeeding → removed | Failed | Cancelled}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, downloader not launched yet.
    Pending,
    /// Downloader running, progress updating.
    Running,
    /// Download finished, commit to the record store in progress.
    Succeeding,
    /// Terminal: resolution, process, or commit failure.
    Failed,
    /// Terminal: cancelled by a caller.
    Cancelled,
}

impl JobState {
    /// Whether this state admits no further transitions.
    ///
    /// Success has no sticky terminal state: a committed job is removed from
    /// the registry instead.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }

    /// String representation for API payloads and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeding => "succeeding",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "running" => Self::Running,
            "succeeding" => Self::Succeeding,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            // "pending" or unknown values default to Pending
            _ => Self::Pending,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only copy of a job, as handed to external observers.
///
/// Carries no cancel capability; each view is a consistent snapshot of one
/// registry entry taken under the registry lock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobView {
    /// The content key this job acquires.
    pub key: ContentKey,
    /// Current state.
    pub state: JobState,
    /// Progress in percent, non-decreasing within [0, 100].
    pub progress_percent: f64,
    /// Failure reason when `state` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the job was accepted.
    pub started_at: DateTime<Utc>,
}

/// Outcome of a `request_acquisition` call.
///
/// The duplicate outcomes (`AlreadyAvailable`, `AlreadyInProgress`) are
/// normal idempotent results, never errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Acceptance {
    /// A new job was registered and started; poll progress for the outcome.
    Accepted,
    /// The artifact is already present in the local library index.
    AlreadyAvailable,
    /// A live job for this key exists; attach to it via progress polling.
    AlreadyInProgress,
    /// The source resolver could not produce a locator; the job is left
    /// visible as `Failed` with this reason.
    ResolutionFailed {
        /// The resolver's failure reason.
        reason: String,
    },
}

impl Acceptance {
    /// Whether this outcome represents a duplicate request short-circuit.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::AlreadyAvailable | Self::AlreadyInProgress)
    }
}
