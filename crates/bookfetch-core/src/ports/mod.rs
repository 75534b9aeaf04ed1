//! Port definitions for the acquisition engine.
//!
//! Ports are async traits held as `Arc<dyn …>` trait objects. The engine
//! (`bookfetch-acquire`) consumes the outbound ports and implements the
//! inbound `AcquisitionPort`; embedding applications supply the outbound
//! implementations (metadata provider, record store, library index, event
//! transport).

mod acquisition;
mod event_emitter;
mod library_index;
mod record_store;
mod source_resolver;

pub use acquisition::{AcquireConfig, AcquisitionPort};
pub use event_emitter::{AcquireEventEmitterPort, NoopAcquireEmitter};
pub use library_index::{LibraryIndexPort, LibraryRecord};
pub use record_store::{AttachedFile, RecordStorePort, StoredRecord};
pub use source_resolver::{ResolvedSource, SourceResolverPort};
