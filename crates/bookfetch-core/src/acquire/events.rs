//! Acquisition events - discriminated union for all job state changes.

use serde::{Deserialize, Serialize};

use super::types::ContentKey;

/// Single discriminated union for all acquisition events.
///
/// Embedding adapters forward these to their transport (SSE, Tauri, test
/// capture). The union is tagged so frontends can handle it as a
/// discriminated union:
///
/// ```json
/// { "type": "job_progress", "key": "abc123", "percent": 42.5 }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AcquireEvent {
    /// A new job was registered for the key.
    JobAccepted {
        /// Content key of the job.
        key: String,
    },

    /// The downloader process was launched.
    JobStarted {
        /// Content key of the job.
        key: String,
    },

    /// Progress update for a running job. Rate-limited by the emitter bridge.
    JobProgress {
        /// Content key of the job.
        key: String,
        /// Progress percentage (0.0 - 100.0), non-decreasing.
        percent: f64,
    },

    /// Download finished; commit to the record store in progress.
    JobCommitting {
        /// Content key of the job.
        key: String,
    },

    /// Artifact durably recorded; the job is removed from the registry.
    JobCompleted {
        /// Content key of the job.
        key: String,
        /// Identifier of the stored record.
        record_id: String,
    },

    /// The job reached the `Failed` terminal state.
    JobFailed {
        /// Content key of the job.
        key: String,
        /// Failure reason.
        error: String,
    },

    /// The job reached the `Cancelled` terminal state.
    JobCancelled {
        /// Content key of the job.
        key: String,
    },
}

impl AcquireEvent {
    /// Create a `JobAccepted` event.
    #[must_use]
    pub fn accepted(key: &ContentKey) -> Self {
        Self::JobAccepted {
            key: key.to_string(),
        }
    }

    /// Create a `JobStarted` event.
    #[must_use]
    pub fn started(key: &ContentKey) -> Self {
        Self::JobStarted {
            key: key.to_string(),
        }
    }

    /// Create a `JobProgress` event.
    #[must_use]
    pub fn progress(key: &ContentKey, percent: f64) -> Self {
        Self::JobProgress {
            key: key.to_string(),
            percent,
        }
    }

    /// Create a `JobCommitting` event.
    #[must_use]
    pub fn committing(key: &ContentKey) -> Self {
        Self::JobCommitting {
            key: key.to_string(),
        }
    }

    /// Create a `JobCompleted` event.
    pub fn completed(key: &ContentKey, record_id: impl Into<String>) -> Self {
        Self::JobCompleted {
            key: key.to_string(),
            record_id: record_id.into(),
        }
    }

    /// Create a `JobFailed` event.
    pub fn failed(key: &ContentKey, error: impl Into<String>) -> Self {
        Self::JobFailed {
            key: key.to_string(),
            error: error.into(),
        }
    }

    /// Create a `JobCancelled` event.
    #[must_use]
    pub fn cancelled(key: &ContentKey) -> Self {
        Self::JobCancelled {
            key: key.to_string(),
        }
    }

    /// The content key this event refers to.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::JobAccepted { key }
            | Self::JobStarted { key }
            | Self::JobProgress { key, .. }
            | Self::JobCommitting { key }
            | Self::JobCompleted { key, .. }
            | Self::JobFailed { key, .. }
            | Self::JobCancelled { key } => key,
        }
    }
}
