//! Read-only progress projection.
//!
//! A side-effect-free view over the job registry for polling clients. It
//! hands out consistent [`JobView`] copies and deliberately carries no
//! control surface: cancel capabilities never cross this boundary.

use std::sync::Arc;

use bookfetch_core::JobView;

use crate::registry::JobRegistry;

/// Polling view over the acquisition job registry.
#[derive(Clone)]
pub struct ProgressReporter {
    registry: Arc<JobRegistry>,
}

impl ProgressReporter {
    /// Create a reporter over `registry`.
    #[must_use]
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self { registry }
    }

    /// Snapshot of all tracked jobs, sorted by key for stable output.
    ///
    /// Always succeeds; empty when no jobs are tracked.
    pub async fn list(&self) -> Vec<JobView> {
        let mut views = self.registry.snapshot().await;
        views.sort_by(|a, b| a.key.cmp(&b.key));
        views
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookfetch_core::{ArtifactMeta, ContentKey, JobState};

    fn key(raw: &str) -> ContentKey {
        ContentKey::new(raw).unwrap()
    }

    #[tokio::test]
    async fn list_is_sorted_and_empty_when_idle() {
        let registry = Arc::new(JobRegistry::new());
        let reporter = ProgressReporter::new(Arc::clone(&registry));

        assert!(reporter.list().await.is_empty());

        registry.try_register(&key("ffff00"), ArtifactMeta::new()).await.unwrap();
        registry.try_register(&key("aaaa00"), ArtifactMeta::new()).await.unwrap();
        registry.try_register(&key("cccc00"), ArtifactMeta::new()).await.unwrap();

        let views = reporter.list().await;
        let keys: Vec<_> = views.iter().map(|v| v.key.as_str().to_string()).collect();
        assert_eq!(keys, vec!["aaaa00", "cccc00", "ffff00"]);
    }

    #[tokio::test]
    async fn views_reflect_registry_state() {
        let registry = Arc::new(JobRegistry::new());
        let reporter = ProgressReporter::new(Arc::clone(&registry));

        let k = key("abc123");
        registry.try_register(&k, ArtifactMeta::new()).await.unwrap();
        registry.mark_running(&k).await;
        registry.record_progress(&k, 33.0).await;

        let views = reporter.list().await;
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].state, JobState::Running);
        assert!((views[0].progress_percent - 33.0).abs() < f64::EPSILON);
    }
}
