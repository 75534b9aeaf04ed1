//! Acquisition port definition.
//!
//! This port is the public interface of the acquisition engine. It abstracts
//! away all implementation details (registry, cancellation tokens, the
//! downloader subprocess) behind a small async API.
//!
//! # Design
//!
//! - Only core domain types in signatures
//! - No `CancellationToken` or process types leak through
//! - `request_acquisition` returns an [`Acceptance`], not a `Result`: every
//!   failure after acceptance is recovered into a job state transition and
//!   observed through polling

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::acquire::{Acceptance, ArtifactMeta, ContentKey, JobView};

/// Configuration for the acquisition engine.
///
/// Contains paths and timing knobs the engine needs. Provider-specific
/// options live behind the outbound ports.
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    /// Directory under which per-job download directories are created.
    pub downloads_directory: PathBuf,
    /// Path of the external downloader executable.
    pub downloader_path: PathBuf,
    /// Extra arguments passed to the downloader before the source URL and
    /// destination directory.
    pub downloader_args: Vec<String>,
    /// Grace period between a termination signal and a forced kill.
    pub grace_period: Duration,
    /// How long `Failed`/`Cancelled` records stay visible before eviction.
    pub finished_retention: Duration,
    /// Interval between retention sweeps.
    pub reap_interval: Duration,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            downloads_directory: PathBuf::from("."),
            downloader_path: PathBuf::from("bookfetch-dl"),
            downloader_args: Vec::new(),
            grace_period: Duration::from_secs(5),
            finished_retention: Duration::from_secs(15 * 60),
            reap_interval: Duration::from_secs(60),
        }
    }
}

impl AcquireConfig {
    /// Create a config with the downloads directory and downloader path.
    #[must_use]
    pub fn new(downloads_directory: PathBuf, downloader_path: PathBuf) -> Self {
        Self {
            downloads_directory,
            downloader_path,
            ..Default::default()
        }
    }

    /// Set extra downloader arguments.
    #[must_use]
    pub fn with_downloader_args(mut self, args: Vec<String>) -> Self {
        self.downloader_args = args;
        self
    }

    /// Set the termination grace period.
    #[must_use]
    pub const fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Set the retention window for terminal records.
    #[must_use]
    pub const fn with_finished_retention(mut self, retention: Duration) -> Self {
        self.finished_retention = retention;
        self
    }

    /// Set the retention sweep interval.
    #[must_use]
    pub const fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }
}

/// Port for requesting and observing acquisitions.
///
/// # Usage
///
/// ```ignore
/// let engine: Arc<dyn AcquisitionPort> = /* ... */;
///
/// // Request an acquisition; returns as soon as the job is registered
/// let outcome = engine
///     .request_acquisition(key.clone(), ArtifactMeta::new().with_title("X"))
///     .await;
///
/// // Observe outcomes by polling
/// let jobs = engine.list_progress().await;
///
/// // Request cancellation; confirmed via a later poll
/// let requested = engine.cancel_acquisition(&key).await;
/// ```
#[async_trait]
pub trait AcquisitionPort: Send + Sync {
    /// Request acquisition of the artifact named by `key`.
    ///
    /// Returns as soon as the job is registered and started - never when it
    /// finishes. Duplicate requests short-circuit to `AlreadyAvailable` /
    /// `AlreadyInProgress`; a resolver failure is reported as
    /// `ResolutionFailed` and leaves a `Failed` record for inspection.
    async fn request_acquisition(&self, key: ContentKey, metadata: ArtifactMeta) -> Acceptance;

    /// Request cancellation of the job for `key`.
    ///
    /// Returns `false` when nothing is there to cancel - a valid outcome,
    /// not an error. `true` means cancellation was signalled; callers poll
    /// progress to observe the eventual `Cancelled` state.
    async fn cancel_acquisition(&self, key: &ContentKey) -> bool;

    /// Snapshot of all tracked jobs. Never fails; empty when idle.
    async fn list_progress(&self) -> Vec<JobView>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builders() {
        let config = AcquireConfig::new(PathBuf::from("/data/downloads"), PathBuf::from("/usr/bin/fetch"))
            .with_downloader_args(vec!["--quiet".to_string()])
            .with_grace_period(Duration::from_secs(2))
            .with_finished_retention(Duration::from_secs(60))
            .with_reap_interval(Duration::from_secs(5));

        assert_eq!(config.downloads_directory, PathBuf::from("/data/downloads"));
        assert_eq!(config.downloader_path, PathBuf::from("/usr/bin/fetch"));
        assert_eq!(config.downloader_args, vec!["--quiet"]);
        assert_eq!(config.grace_period, Duration::from_secs(2));
        assert_eq!(config.finished_retention, Duration::from_secs(60));
        assert_eq!(config.reap_interval, Duration::from_secs(5));
    }

    #[test]
    fn config_default_is_sane() {
        let config = AcquireConfig::default();
        assert!(config.grace_period > Duration::ZERO);
        assert!(config.finished_retention > config.reap_interval);
    }
}
