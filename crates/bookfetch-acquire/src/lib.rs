//! Acquisition engine for bookfetch.
//!
//! Orchestrates long-running acquisition jobs: each job supervises one
//! external downloader invocation, streams its progress into an in-memory
//! job registry, supports cooperative cancellation, and commits the finished
//! artifact into the persistent record store exactly once.
//!
//! # Architecture
//!
//! - **Registry**: concurrency-safe job table, the single source of truth
//!   for "is an acquisition for key K already running"
//! - **Fetcher**: supervises one downloader process end-to-end (spawn,
//!   progress parsing, cancellation with kill escalation, cleanup)
//! - **Service**: the public operation surface and the transactional
//!   boundary between "download succeeded" and "artifact durably recorded"
//! - **Reporter**: read-only registry projection for polling clients
//!
//! # Concurrency Model
//!
//! - One supervising task per accepted job; jobs for different keys run
//!   fully in parallel
//! - Per-key state transitions are strictly ordered by the single
//!   supervising task for that key
//! - The registry's internal mutex is the only shared mutable state

// Re-export core types for convenience
pub use bookfetch_core::{
    Acceptance, AcquireConfig, AcquireError, AcquireEvent, AcquisitionPort, ArtifactMeta,
    ContentKey, JobState, JobView,
};

mod fetcher;
mod registry;
mod reporter;
mod service;

pub use fetcher::{FetchJob, FetchedArtifact, ProgressUpdate, run_fetch};
pub use registry::JobRegistry;
pub use reporter::ProgressReporter;
pub use service::{AcquisitionDeps, AcquisitionService, FetchDestination, build_acquisition_service};
