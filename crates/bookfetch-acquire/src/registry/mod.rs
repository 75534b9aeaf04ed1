//! In-memory acquisition job registry.
//!
//! The single source of truth for "is an acquisition for key K already
//! running", and the sole enforcement point of the at-most-one-active-job-
//! per-key invariant. One mutex guards one map; no nested locking, and the
//! lock is never held across foreign awaits.
//!
//! External observers only ever receive [`JobView`] copies; the cancel
//! capability stays inside the registry and is fired through
//! [`JobRegistry::signal_cancel`] without being exposed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use bookfetch_core::{ArtifactMeta, ContentKey, JobState, JobView};

/// One tracked acquisition attempt.
///
/// Internal to the registry; never handed out by reference.
#[derive(Debug, Clone)]
struct AcquisitionJob {
    state: JobState,
    /// Non-decreasing, clamped to [0, 100].
    progress_percent: f64,
    /// Caller-supplied metadata, held for the job's lifetime.
    metadata: ArtifactMeta,
    /// Failure reason once `state` is `Failed`.
    error: Option<String>,
    /// Cancel capability. Created at registration so a cancel request can
    /// never race the downloader launch.
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
    /// Set on entry into a terminal state; drives retention eviction.
    finished_at: Option<Instant>,
}

impl AcquisitionJob {
    fn new(metadata: ArtifactMeta) -> Self {
        Self {
            state: JobState::Pending,
            progress_percent: 0.0,
            metadata,
            error: None,
            cancel: CancellationToken::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn view(&self, key: &ContentKey) -> JobView {
        JobView {
            key: key.clone(),
            state: self.state,
            progress_percent: self.progress_percent,
            error: self.error.clone(),
            started_at: self.started_at,
        }
    }
}

/// Concurrency-safe bookkeeping of acquisition jobs keyed by content key.
///
/// All operations are infallible in-memory state transitions. Transition
/// methods are no-ops for absent keys: a job may finish and be removed while
/// an update from its (by then stale) producer is in flight, and callers
/// must tolerate that lost update rather than treat it as an error.
pub struct JobRegistry {
    jobs: Mutex<HashMap<ContentKey, AcquisitionJob>>,
}

impl JobRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Atomically register a new `Pending` job for `key`.
    ///
    /// This is the de-duplication gate: the insert happens iff no job holds
    /// the slot, or the holder is terminal (`Failed`/`Cancelled` records are
    /// superseded by a fresh request, so stale entries never block a retry).
    ///
    /// Returns the new job's cancel token, or `None` when a live job already
    /// holds the slot - callers treat `None` as "attach to the existing
    /// job", never as an error.
    pub async fn try_register(
        &self,
        key: &ContentKey,
        metadata: ArtifactMeta,
    ) -> Option<CancellationToken> {
        let mut jobs = self.jobs.lock().await;
        if let Some(existing) = jobs.get(key) {
            if !existing.state.is_terminal() {
                return None;
            }
            tracing::debug!(key = %key, state = %existing.state, "Superseding finished record");
        }

        let job = AcquisitionJob::new(metadata);
        let token = job.cancel.clone();
        jobs.insert(key.clone(), job);
        Some(token)
    }

    /// Snapshot read of a single job.
    pub async fn get(&self, key: &ContentKey) -> Option<JobView> {
        let jobs = self.jobs.lock().await;
        jobs.get(key).map(|job| job.view(key))
    }

    /// Caller-supplied metadata of a tracked job.
    pub async fn metadata(&self, key: &ContentKey) -> Option<ArtifactMeta> {
        let jobs = self.jobs.lock().await;
        jobs.get(key).map(|job| job.metadata.clone())
    }

    /// Transition `Pending → Running`.
    pub async fn mark_running(&self, key: &ContentKey) {
        self.transition(key, JobState::Running, None).await;
    }

    /// Transition `Running → Succeeding` (commit in progress).
    pub async fn mark_succeeding(&self, key: &ContentKey) {
        self.transition(key, JobState::Succeeding, None).await;
    }

    /// Transition into the terminal `Failed` state with a reason.
    pub async fn mark_failed(&self, key: &ContentKey, error: impl Into<String>) {
        self.transition(key, JobState::Failed, Some(error.into())).await;
    }

    /// Transition into the terminal `Cancelled` state.
    pub async fn mark_cancelled(&self, key: &ContentKey) {
        self.transition(key, JobState::Cancelled, None).await;
    }

    /// Record a progress sample for a `Running` job.
    ///
    /// Values are clamped to [0, 100]; regressions are ignored so observed
    /// progress is monotonically non-decreasing. No-op outside `Running`.
    pub async fn record_progress(&self, key: &ContentKey, percent: f64) {
        let clamped = percent.clamp(0.0, 100.0);
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(key) {
            if job.state == JobState::Running && clamped > job.progress_percent {
                job.progress_percent = clamped;
            }
        }
    }

    /// Delete the entry for `key`. Idempotent.
    pub async fn remove(&self, key: &ContentKey) {
        let mut jobs = self.jobs.lock().await;
        jobs.remove(key);
    }

    /// Consistent snapshot of all tracked jobs, cancel capability stripped.
    pub async fn snapshot(&self) -> Vec<JobView> {
        let jobs = self.jobs.lock().await;
        jobs.iter().map(|(key, job)| job.view(key)).collect()
    }

    /// Fire the cancel token of a live job without exposing it.
    ///
    /// Returns `false` when the key is absent or already terminal - a valid
    /// outcome, not an error. Idempotent: repeated signals are no-ops.
    pub async fn signal_cancel(&self, key: &ContentKey) -> bool {
        let jobs = self.jobs.lock().await;
        match jobs.get(key) {
            Some(job) if !job.state.is_terminal() => {
                job.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Evict terminal records older than `retention`.
    ///
    /// Live jobs are never touched. Returns the number of evicted records.
    pub async fn evict_finished(&self, retention: Duration) -> usize {
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|_, job| {
            job.finished_at
                .is_none_or(|finished| finished.elapsed() < retention)
        });
        before - jobs.len()
    }

    /// Shutdown cleanup for process termination.
    ///
    /// Fires every live job's cancel token. Synchronous (usable from
    /// shutdown hooks outside the runtime), so it uses `try_lock` and
    /// reports zero when the registry is busy.
    pub fn shutdown_cleanup(&self) -> usize {
        self.jobs.try_lock().map_or_else(
            |_| {
                tracing::warn!("Shutdown cleanup: couldn't acquire registry lock");
                0
            },
            |jobs| {
                let mut count = 0;
                for job in jobs.values() {
                    if !job.state.is_terminal() {
                        job.cancel.cancel();
                        count += 1;
                    }
                }
                tracing::info!(count, "Shutdown cleanup: cancelled acquisition tokens");
                count
            },
        )
    }

    /// Apply a forward-only state transition.
    ///
    /// Disallowed transitions (anything out of a terminal state, skipping
    /// `Running`, or interrupting a commit) are dropped, keeping the
    /// per-key state machine strictly forward.
    async fn transition(&self, key: &ContentKey, next: JobState, error: Option<String>) {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.get_mut(key) else {
            tracing::debug!(key = %key, next = %next, "Dropping transition for removed job");
            return;
        };

        let allowed = match next {
            JobState::Pending => false,
            JobState::Running => job.state == JobState::Pending,
            JobState::Succeeding => job.state == JobState::Running,
            JobState::Failed => !job.state.is_terminal(),
            JobState::Cancelled => {
                matches!(job.state, JobState::Pending | JobState::Running)
            }
        };

        if !allowed {
            tracing::debug!(
                key = %key,
                from = %job.state,
                to = %next,
                "Dropping disallowed state transition"
            );
            return;
        }

        job.state = next;
        job.error = error;
        if next.is_terminal() {
            job.finished_at = Some(Instant::now());
        }
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> ContentKey {
        ContentKey::new(raw).unwrap()
    }

    #[tokio::test]
    async fn register_is_compare_and_insert() {
        let registry = JobRegistry::new();
        let k = key("abc123");

        assert!(registry.try_register(&k, ArtifactMeta::new()).await.is_some());
        assert!(registry.try_register(&k, ArtifactMeta::new()).await.is_none());

        let other = key("def456");
        assert!(registry.try_register(&other, ArtifactMeta::new()).await.is_some());
    }

    #[tokio::test]
    async fn terminal_records_are_superseded() {
        let registry = JobRegistry::new();
        let k = key("abc123");

        registry.try_register(&k, ArtifactMeta::new()).await.unwrap();
        registry.mark_failed(&k, "mirror down").await;

        // A fresh request replaces the failed record with a new Pending job
        let token = registry.try_register(&k, ArtifactMeta::new()).await;
        assert!(token.is_some());

        let view = registry.get(&k).await.unwrap();
        assert_eq!(view.state, JobState::Pending);
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn transitions_are_forward_only() {
        let registry = JobRegistry::new();
        let k = key("abc123");
        registry.try_register(&k, ArtifactMeta::new()).await.unwrap();

        // Succeeding requires Running first
        registry.mark_succeeding(&k).await;
        assert_eq!(registry.get(&k).await.unwrap().state, JobState::Pending);

        registry.mark_running(&k).await;
        registry.mark_succeeding(&k).await;
        assert_eq!(registry.get(&k).await.unwrap().state, JobState::Succeeding);

        // No transition out of a terminal state
        registry.mark_failed(&k, "commit failed").await;
        registry.mark_cancelled(&k).await;
        registry.mark_running(&k).await;
        let view = registry.get(&k).await.unwrap();
        assert_eq!(view.state, JobState::Failed);
        assert_eq!(view.error.as_deref(), Some("commit failed"));
    }

    #[tokio::test]
    async fn cancel_does_not_interrupt_commit() {
        let registry = JobRegistry::new();
        let k = key("abc123");
        registry.try_register(&k, ArtifactMeta::new()).await.unwrap();
        registry.mark_running(&k).await;
        registry.mark_succeeding(&k).await;

        registry.mark_cancelled(&k).await;
        assert_eq!(registry.get(&k).await.unwrap().state, JobState::Succeeding);
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_clamped() {
        let registry = JobRegistry::new();
        let k = key("abc123");
        registry.try_register(&k, ArtifactMeta::new()).await.unwrap();

        // Ignored while Pending
        registry.record_progress(&k, 10.0).await;
        assert!(registry.get(&k).await.unwrap().progress_percent.abs() < f64::EPSILON);

        registry.mark_running(&k).await;
        registry.record_progress(&k, 40.0).await;
        registry.record_progress(&k, 25.0).await; // regression ignored
        assert!((registry.get(&k).await.unwrap().progress_percent - 40.0).abs() < f64::EPSILON);

        registry.record_progress(&k, 250.0).await; // clamped
        assert!((registry.get(&k).await.unwrap().progress_percent - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn updates_after_removal_are_lost_quietly() {
        let registry = JobRegistry::new();
        let k = key("abc123");
        registry.try_register(&k, ArtifactMeta::new()).await.unwrap();
        registry.remove(&k).await;
        registry.remove(&k).await; // idempotent

        registry.mark_running(&k).await;
        registry.record_progress(&k, 50.0).await;
        assert!(registry.get(&k).await.is_none());
    }

    #[tokio::test]
    async fn signal_cancel_fires_the_registered_token() {
        let registry = JobRegistry::new();
        let k = key("abc123");
        let token = registry.try_register(&k, ArtifactMeta::new()).await.unwrap();

        assert!(!token.is_cancelled());
        assert!(registry.signal_cancel(&k).await);
        assert!(token.is_cancelled());

        // Idempotent while live; false once terminal or absent
        assert!(registry.signal_cancel(&k).await);
        registry.mark_cancelled(&k).await;
        assert!(!registry.signal_cancel(&k).await);
        assert!(!registry.signal_cancel(&key("def456")).await);
    }

    #[tokio::test]
    async fn snapshot_carries_no_cancel_capability() {
        let registry = JobRegistry::new();
        let k = key("abc123");
        let token = registry.try_register(&k, ArtifactMeta::new()).await.unwrap();
        registry.mark_running(&k).await;
        registry.record_progress(&k, 12.5).await;

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].key, k);
        assert_eq!(snapshot[0].state, JobState::Running);
        assert!((snapshot[0].progress_percent - 12.5).abs() < f64::EPSILON);

        // Mutating the copy has no effect on the registry, and the token
        // stays untouched by snapshot reads.
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn eviction_only_touches_old_terminal_records() {
        let registry = JobRegistry::new();
        let failed = key("abc123");
        let live = key("def456");
        registry.try_register(&failed, ArtifactMeta::new()).await.unwrap();
        registry.try_register(&live, ArtifactMeta::new()).await.unwrap();
        registry.mark_failed(&failed, "boom").await;
        registry.mark_running(&live).await;

        // Nothing is old enough yet
        assert_eq!(registry.evict_finished(Duration::from_secs(60)).await, 0);

        // Zero retention evicts the terminal record but never the live job
        assert_eq!(registry.evict_finished(Duration::ZERO).await, 1);
        assert!(registry.get(&failed).await.is_none());
        assert!(registry.get(&live).await.is_some());
    }

    #[tokio::test]
    async fn shutdown_cleanup_cancels_live_jobs_only() {
        let registry = JobRegistry::new();
        let running = key("abc123");
        let failed = key("def456");
        let token = registry.try_register(&running, ArtifactMeta::new()).await.unwrap();
        registry.try_register(&failed, ArtifactMeta::new()).await.unwrap();
        registry.mark_failed(&failed, "boom").await;

        assert_eq!(registry.shutdown_cleanup(), 1);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn metadata_is_held_for_the_job_lifetime() {
        let registry = JobRegistry::new();
        let k = key("abc123");
        let meta = ArtifactMeta::new().with_title("Dune");
        registry.try_register(&k, meta.clone()).await.unwrap();

        assert_eq!(registry.metadata(&k).await, Some(meta));
        assert_eq!(registry.metadata(&key("def456")).await, None);
    }
}
