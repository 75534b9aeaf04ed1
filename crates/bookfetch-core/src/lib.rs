//! Core domain types and port definitions for the bookfetch acquisition engine.
//!
//! This crate is pure: data types, the error taxonomy, the event union, and
//! the async port traits the engine depends on. No I/O happens here; the
//! engine implementation lives in `bookfetch-acquire`, and embedding
//! applications supply the outbound ports (source resolver, record store,
//! library index, event emitter).

pub mod acquire;
pub mod ports;

// Re-export commonly used types for convenience
pub use acquire::{
    Acceptance, AcquireError, AcquireEvent, AcquireResult, ArtifactMeta, ContentKey, JobState,
    JobView,
};
pub use ports::{
    AcquireConfig, AcquireEventEmitterPort, AcquisitionPort, AttachedFile, LibraryIndexPort,
    LibraryRecord, NoopAcquireEmitter, RecordStorePort, ResolvedSource, SourceResolverPort,
    StoredRecord,
};
