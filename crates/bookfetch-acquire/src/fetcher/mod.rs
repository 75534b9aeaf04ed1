//! Downloader process supervision.
//!
//! This module runs one external downloader invocation end-to-end: spawn,
//! progress parsing from stdout, cooperative cancellation with kill
//! escalation, exit-status mapping, and destination cleanup on every
//! non-success path.
//!
//! # Design Principles
//!
//! - The fetcher receives a [`FetchJob`] (value type) with no references
//!   back to the registry or service
//! - Progress flows only through the job's `watch::Sender`; the service's
//!   bridge task folds it into the registry and the event emitter
//! - Exactly one terminal resolution per job; the destination directory is
//!   owned by the fetcher until it returns

pub(crate) mod parse;
mod shutdown;
mod throttle;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use bookfetch_core::{AcquireConfig, AcquireError, ContentKey};

use throttle::ProgressThrottle;

/// How many trailing stderr lines are kept for failure reporting.
const STDERR_TAIL_LINES: usize = 8;

/// Progress update sent through the watch channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    /// Percent complete, non-decreasing within [0, 100].
    pub percent: f64,
    /// Monotonically increasing sequence number for change detection.
    pub seq: u64,
}

impl ProgressUpdate {
    /// Create a new progress update with a sequence number.
    #[must_use]
    pub const fn new(percent: f64, seq: u64) -> Self {
        Self { percent, seq }
    }
}

/// A fetch to be executed by the supervisor.
///
/// Value type containing everything needed to run one downloader
/// invocation, with no references back to the service.
pub struct FetchJob {
    /// The content key being acquired.
    pub key: ContentKey,
    /// Source locator passed to the downloader.
    pub source_url: String,
    /// Destination directory, exclusively owned by this fetch until it
    /// terminates.
    pub dest_dir: PathBuf,
    /// Cancellation token for this job.
    pub cancel: CancellationToken,
    /// Progress sender for this job.
    pub progress_tx: watch::Sender<ProgressUpdate>,
}

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchedArtifact {
    /// The content key that was acquired.
    pub key: ContentKey,
    /// Output files: the primary artifact first, auxiliary files after.
    pub files: Vec<PathBuf>,
}

/// Run a fetch job to completion.
///
/// Spawns exactly one downloader process with `(extra args…, source_url,
/// dest_dir)` and supervises it until a single terminal resolution:
///
/// - `Ok(FetchedArtifact)` - zero exit with at least one output file
/// - `Err(Cancelled)` - the token fired; the child was shut down with
///   SIGTERM → SIGKILL escalation and partial output was deleted
/// - `Err(Spawn | Process | NoOutput | Io)` - everything else, with the
///   destination directory removed
///
/// Progress percentages are parsed from stdout lines ([`parse`]); malformed
/// lines are ignored. Cancelling after the process finished is a no-op.
pub async fn run_fetch(job: FetchJob, config: &AcquireConfig) -> Result<FetchedArtifact, AcquireError> {
    let mut child = Command::new(&config.downloader_path)
        .args(&config.downloader_args)
        .arg(&job.source_url)
        .arg(&job.dest_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            AcquireError::spawn(format!(
                "{}: {e}",
                config.downloader_path.display()
            ))
        })?;

    tracing::debug!(
        key = %job.key,
        downloader = %config.downloader_path.display(),
        dest = %job.dest_dir.display(),
        "Downloader spawned"
    );

    let stdout_task = child.stdout.take().map(|stdout| {
        let progress_tx = job.progress_tx.clone();
        let key = job.key.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut throttle = ProgressThrottle::default_interval();
            while let Ok(Some(line)) = lines.next_line().await {
                let Some(percent) = parse::percent_token(&line) else {
                    tracing::trace!(key = %key, line = %line, "Ignoring non-progress line");
                    continue;
                };
                if throttle.should_emit(percent) {
                    // send_modify avoids clone and is infallible
                    progress_tx.send_modify(|state| {
                        if percent > state.percent {
                            state.percent = percent;
                        }
                        state.seq += 1;
                    });
                }
            }
            tracing::debug!(key = %key, "stdout reader task exiting");
        })
    });

    let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
    let stderr_task = child.stderr.take().map(|stderr| {
        let tail = Arc::clone(&stderr_tail);
        let key = job.key.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(key = %key, "stderr: {}", line);
                let mut tail = tail.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        })
    });

    // Wait for exit or cancellation; the handler bodies must not touch the
    // child, so the wait future's borrow ends with the select expression.
    let mut wait_result = None;
    tokio::select! {
        biased;

        () = job.cancel.cancelled() => {}

        result = child.wait() => {
            wait_result = Some(result);
        }
    }

    let Some(wait_result) = wait_result else {
        // Cancelled: terminate the child, then drop partial output
        tracing::info!(key = %job.key, "Cancellation requested, stopping downloader");
        let _ = shutdown::shutdown_child(&mut child, config.grace_period).await;
        join_readers(stdout_task, stderr_task).await;
        discard_dir(&job.dest_dir);
        return Err(AcquireError::Cancelled);
    };

    // Let the readers drain the closed pipes before inspecting their output
    join_readers(stdout_task, stderr_task).await;

    let status = match wait_result {
        Ok(status) => status,
        Err(e) => {
            discard_dir(&job.dest_dir);
            return Err(AcquireError::from_io_error(&e));
        }
    };

    if !status.success() {
        let message = {
            let tail = stderr_tail
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if tail.is_empty() {
                "no diagnostic output".to_string()
            } else {
                tail.iter().cloned().collect::<Vec<_>>().join(" | ")
            }
        };
        discard_dir(&job.dest_dir);
        return Err(AcquireError::process(status.code(), message));
    }

    let files = collect_output_files(&job.dest_dir)?;
    if files.is_empty() {
        discard_dir(&job.dest_dir);
        return Err(AcquireError::NoOutput);
    }

    // Terminal progress token so late pollers see 100%
    job.progress_tx.send_modify(|state| {
        state.percent = 100.0;
        state.seq += 1;
    });

    tracing::info!(key = %job.key, files = files.len(), "Downloader finished");
    Ok(FetchedArtifact {
        key: job.key,
        files,
    })
}

async fn join_readers(
    stdout_task: Option<tokio::task::JoinHandle<()>>,
    stderr_task: Option<tokio::task::JoinHandle<()>>,
) {
    if let Some(task) = stdout_task {
        let _ = task.await;
    }
    if let Some(task) = stderr_task {
        let _ = task.await;
    }
}

/// Collect the downloader's output files.
///
/// The largest file is the primary artifact and sorts first; auxiliary
/// files (e.g. a cover thumbnail) follow in name order.
fn collect_output_files(dir: &Path) -> Result<Vec<PathBuf>, AcquireError> {
    let entries = std::fs::read_dir(dir).map_err(|e| AcquireError::from_io_error(&e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AcquireError::from_io_error(&e))?;
        let metadata = entry.metadata().map_err(|e| AcquireError::from_io_error(&e))?;
        if metadata.is_file() {
            files.push((entry.path(), metadata.len()));
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    let primary = files
        .iter()
        .enumerate()
        .max_by_key(|(_, (_, size))| *size)
        .map(|(idx, _)| idx);

    let mut ordered = Vec::with_capacity(files.len());
    if let Some(idx) = primary {
        ordered.push(files.remove(idx).0);
    }
    ordered.extend(files.into_iter().map(|(path, _)| path));
    Ok(ordered)
}

/// Best-effort removal of a (possibly partial) destination directory.
fn discard_dir(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to remove download directory");
        }
    }
}
