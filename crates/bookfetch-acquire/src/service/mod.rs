//! Acquisition service implementation.
//!
//! The public operation surface of the engine and the transactional
//! boundary between "download succeeded" and "artifact durably recorded".
//!
//! # Architecture
//!
//! - **Service**: validates requests, consults the library index, resolves
//!   sources, and registers jobs
//! - **Supervisor task**: one per accepted job; runs the fetch + commit
//!   pipeline and folds the outcome into the registry
//! - **Bridge task**: subscribes to the fetch's watch channel and folds
//!   progress into the registry and the event emitter with rate-limiting
//!
//! # Concurrency Model
//!
//! - `request_acquisition` returns as soon as the job is registered and
//!   started, never when it finishes
//! - Jobs for different keys proceed fully in parallel; per-key ordering is
//!   guaranteed by the single supervisor task per key
//! - The cancel token is created at registration, so a cancel request can
//!   never race the downloader launch

mod paths;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use bookfetch_core::{
    Acceptance, AcquireConfig, AcquireEvent, AcquireEventEmitterPort, AcquisitionPort,
    ArtifactMeta, AttachedFile, ContentKey, JobView, LibraryIndexPort, RecordStorePort,
    SourceResolverPort,
};

use crate::fetcher::{self, FetchJob, FetchedArtifact, ProgressUpdate};
use crate::registry::JobRegistry;
use crate::reporter::ProgressReporter;

pub use paths::FetchDestination;

/// Interval at which buffered progress is folded into the registry.
const PROGRESS_BRIDGE_INTERVAL: Duration = Duration::from_millis(250);

/// Record field the primary artifact is committed under.
const PRIMARY_FILE_FIELD: &str = "book";

/// Dependencies for creating an acquisition service.
///
/// Bundles all the ports and configuration needed to construct an
/// [`AcquisitionService`].
pub struct AcquisitionDeps<R, S, L, E>
where
    R: SourceResolverPort + 'static,
    S: RecordStorePort + 'static,
    L: LibraryIndexPort + 'static,
    E: AcquireEventEmitterPort + 'static,
{
    /// Port for resolving content keys to download sources.
    pub resolver: Arc<R>,
    /// Port for committing finished artifacts.
    pub record_store: Arc<S>,
    /// Port for the local library short-circuit lookup.
    pub library: Arc<L>,
    /// Port for emitting acquisition events.
    pub event_emitter: Arc<E>,
    /// Engine configuration.
    pub config: AcquireConfig,
}

/// Build an acquisition service from its dependencies.
///
/// Returns an implementation of [`AcquisitionPort`] that can be stored as
/// `Arc<dyn AcquisitionPort>` in adapters.
pub fn build_acquisition_service<R, S, L, E>(deps: AcquisitionDeps<R, S, L, E>) -> AcquisitionService
where
    R: SourceResolverPort + 'static,
    S: RecordStorePort + 'static,
    L: LibraryIndexPort + 'static,
    E: AcquireEventEmitterPort + 'static,
{
    AcquisitionService::new(
        deps.resolver,
        deps.record_store,
        deps.library,
        deps.event_emitter,
        deps.config,
    )
}

/// Concrete implementation of the acquisition engine.
///
/// This struct is public but adapters should typically use
/// `Arc<dyn AcquisitionPort>` instead of depending on this type directly.
pub struct AcquisitionService {
    registry: Arc<JobRegistry>,
    reporter: ProgressReporter,
    resolver: Arc<dyn SourceResolverPort>,
    record_store: Arc<dyn RecordStorePort>,
    library: Arc<dyn LibraryIndexPort>,
    event_emitter: Arc<dyn AcquireEventEmitterPort>,
    config: AcquireConfig,
    /// Whether the retention reaper has been started (never reset).
    reaper_started: AtomicBool,
}

impl AcquisitionService {
    fn new<R, S, L, E>(
        resolver: Arc<R>,
        record_store: Arc<S>,
        library: Arc<L>,
        event_emitter: Arc<E>,
        config: AcquireConfig,
    ) -> Self
    where
        R: SourceResolverPort + 'static,
        S: RecordStorePort + 'static,
        L: LibraryIndexPort + 'static,
        E: AcquireEventEmitterPort + 'static,
    {
        let registry = Arc::new(JobRegistry::new());
        Self {
            reporter: ProgressReporter::new(Arc::clone(&registry)),
            registry,
            resolver,
            record_store,
            library,
            event_emitter,
            config,
            reaper_started: AtomicBool::new(false),
        }
    }

    /// The job registry backing this service.
    ///
    /// Exposed for embedders that wire their own read-only views.
    #[must_use]
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Ensure the retention reaper is running.
    ///
    /// Idempotent: the reaper runs for the lifetime of the process and
    /// periodically evicts `Failed`/`Cancelled` records older than the
    /// configured retention window, so stale entries don't accumulate when
    /// nobody retries them.
    pub fn ensure_reaper(&self) {
        if self
            .reaper_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let registry = Arc::clone(&self.registry);
            let retention = self.config.finished_retention;
            let every = self.config.reap_interval;
            tokio::spawn(async move {
                let mut tick = interval(every);
                tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tick.tick().await;
                    let evicted = registry.evict_finished(retention).await;
                    if evicted > 0 {
                        tracing::debug!(evicted, "Evicted finished acquisition records");
                    }
                }
            });
        }
    }

    /// Shutdown cleanup for process termination.
    ///
    /// Signals cancellation to every live job. Returns the number of jobs
    /// signalled.
    pub fn shutdown_cleanup(&self) -> usize {
        self.registry.shutdown_cleanup()
    }
}

#[async_trait]
impl AcquisitionPort for AcquisitionService {
    async fn request_acquisition(&self, key: ContentKey, metadata: ArtifactMeta) -> Acceptance {
        self.ensure_reaper();

        // Step 1: local library short-circuit - no network or process work
        if let Some(record) = self.library.lookup(&key).await {
            tracing::debug!(key = %key, record_id = %record.id, "Artifact already in library");
            return Acceptance::AlreadyAvailable;
        }

        // Step 2: registry gate - at most one live job per key
        let Some(cancel) = self.registry.try_register(&key, metadata.clone()).await else {
            tracing::debug!(key = %key, "Acquisition already in progress");
            return Acceptance::AlreadyInProgress;
        };
        self.event_emitter.emit(AcquireEvent::accepted(&key));

        // Step 3: resolve the source; a failure is a terminal job state,
        // left visible for inspection, never a fault
        let resolved = match self.resolver.resolve_source(&key).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Source resolution failed");
                let reason = e.to_string();
                self.registry.mark_failed(&key, reason.clone()).await;
                self.event_emitter.emit(AcquireEvent::failed(&key, reason.clone()));
                return Acceptance::ResolutionFailed { reason };
            }
        };

        tracing::info!(key = %key, url = %resolved.url, "Acquisition accepted");

        // Steps 4-5 proceed asynchronously; the caller polls for the outcome
        let supervisor = JobSupervisor {
            key,
            source_url: resolved.url,
            metadata: metadata.merged_over(&resolved.metadata),
            cancel,
            registry: Arc::clone(&self.registry),
            record_store: Arc::clone(&self.record_store),
            event_emitter: self.event_emitter.clone_box(),
            config: self.config.clone(),
        };
        tokio::spawn(supervisor.run());

        Acceptance::Accepted
    }

    async fn cancel_acquisition(&self, key: &ContentKey) -> bool {
        let signalled = self.registry.signal_cancel(key).await;
        if signalled {
            tracing::info!(key = %key, "Cancellation requested");
        } else {
            tracing::debug!(key = %key, "Nothing to cancel");
        }
        signalled
    }

    async fn list_progress(&self) -> Vec<JobView> {
        self.reporter.list().await
    }
}

/// Everything one job's supervisor task needs, with no references back to
/// the service.
struct JobSupervisor {
    key: ContentKey,
    source_url: String,
    /// Caller metadata merged over resolver metadata (caller wins).
    metadata: ArtifactMeta,
    cancel: CancellationToken,
    registry: Arc<JobRegistry>,
    record_store: Arc<dyn RecordStorePort>,
    event_emitter: Box<dyn AcquireEventEmitterPort>,
    config: AcquireConfig,
}

impl JobSupervisor {
    /// Run the fetch + commit pipeline for one job.
    async fn run(self) {
        // A cancel can arrive between registration and here; honor it
        // before spawning anything
        if self.cancel.is_cancelled() {
            self.registry.mark_cancelled(&self.key).await;
            self.event_emitter.emit(AcquireEvent::cancelled(&self.key));
            return;
        }

        let destination = FetchDestination::plan(&self.config.downloads_directory, &self.key);
        if let Err(e) = destination.ensure_dir() {
            tracing::warn!(key = %self.key, error = %e, "Cannot prepare download directory");
            let reason = e.to_string();
            self.registry.mark_failed(&self.key, reason.clone()).await;
            self.event_emitter.emit(AcquireEvent::failed(&self.key, reason));
            return;
        }

        let (progress_tx, progress_rx) = watch::channel(ProgressUpdate::default());
        let bridge_handle = spawn_progress_bridge(
            Arc::clone(&self.registry),
            self.event_emitter.clone_box(),
            self.key.clone(),
            progress_rx,
        );

        self.registry.mark_running(&self.key).await;
        self.event_emitter.emit(AcquireEvent::started(&self.key));

        let job = FetchJob {
            key: self.key.clone(),
            source_url: self.source_url.clone(),
            dest_dir: destination.dir.clone(),
            cancel: self.cancel.clone(),
            progress_tx,
        };

        // run_fetch consumes the sender; when it returns, the bridge sees
        // the channel close and flushes its final sample
        let result = fetcher::run_fetch(job, &self.config).await;
        let _ = bridge_handle.await;

        match result {
            Ok(artifact) => self.finalize_success(&destination, artifact).await,
            Err(e) if e.is_cancelled() => {
                tracing::info!(key = %self.key, "Acquisition cancelled");
                self.registry.mark_cancelled(&self.key).await;
                self.event_emitter.emit(AcquireEvent::cancelled(&self.key));
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Acquisition failed");
                let reason = e.to_string();
                self.registry.mark_failed(&self.key, reason.clone()).await;
                self.event_emitter.emit(AcquireEvent::failed(&self.key, reason));
            }
        }
    }

    /// Commit the fetched artifact; the transactional boundary.
    ///
    /// A commit failure does not re-queue the download: the files are
    /// discarded and the key becomes retryable from scratch, so a flaky
    /// store can never double-write partial state.
    async fn finalize_success(&self, destination: &FetchDestination, artifact: FetchedArtifact) {
        self.registry.mark_succeeding(&self.key).await;
        self.event_emitter.emit(AcquireEvent::committing(&self.key));

        let files = attachment_fields(&artifact.files);
        match self.record_store.commit(&self.metadata, &files).await {
            Ok(record) => {
                tracing::info!(
                    key = %self.key,
                    record_id = %record.id,
                    files = files.len(),
                    "Artifact committed"
                );
                // The store owns the artifact now; drop the working copy
                destination.discard();
                self.event_emitter.emit(AcquireEvent::completed(&self.key, record.id));
                // Removal last: once the slot is gone the key is free again
                self.registry.remove(&self.key).await;
            }
            Err(e) => {
                tracing::warn!(
                    key = %self.key,
                    error = %e,
                    "Commit failed - discarding downloaded files"
                );
                destination.discard();
                let reason = e.to_string();
                self.registry.mark_failed(&self.key, reason.clone()).await;
                self.event_emitter.emit(AcquireEvent::failed(&self.key, reason));
            }
        }
    }
}

/// Spawn the task that folds watch-channel progress into the registry and
/// the event emitter, rate-limited to [`PROGRESS_BRIDGE_INTERVAL`].
///
/// Exits after flushing the final sample once the sender is dropped.
fn spawn_progress_bridge(
    registry: Arc<JobRegistry>,
    event_emitter: Box<dyn AcquireEventEmitterPort>,
    key: ContentKey,
    mut rx: watch::Receiver<ProgressUpdate>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(PROGRESS_BRIDGE_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_seq = 0u64;

        loop {
            tokio::select! {
                result = rx.changed() => {
                    if result.is_err() {
                        // Sender dropped (fetch finished): flush the final
                        // sample and exit
                        let last = rx.borrow().clone();
                        if last.seq > last_seq {
                            registry.record_progress(&key, last.percent).await;
                            event_emitter.emit(AcquireEvent::progress(&key, last.percent));
                        }
                        break;
                    }
                    // Progress changed, picked up on the next tick
                }

                _ = tick.tick() => {
                    let current = rx.borrow().clone();
                    if current.seq > last_seq {
                        registry.record_progress(&key, current.percent).await;
                        event_emitter.emit(AcquireEvent::progress(&key, current.percent));
                        last_seq = current.seq;
                    }
                }
            }
        }
    })
}

/// Assign record field names to the fetched files.
///
/// The primary artifact is committed under [`PRIMARY_FILE_FIELD`];
/// auxiliary files use their (lowercased) file stem, falling back to a
/// positional name.
fn attachment_fields(files: &[std::path::PathBuf]) -> Vec<AttachedFile> {
    files
        .iter()
        .enumerate()
        .map(|(idx, path)| {
            let field = if idx == 0 {
                PRIMARY_FILE_FIELD.to_string()
            } else {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map_or_else(|| format!("aux{idx}"), str::to_lowercase)
            };
            AttachedFile::new(field, path.clone())
        })
        .collect()
}
