//! Acquisition domain: keys, job states, metadata, errors, and events.

mod errors;
mod events;
mod types;

pub use errors::{AcquireError, AcquireResult};
pub use events::AcquireEvent;
pub use types::{Acceptance, ArtifactMeta, ContentKey, JobState, JobView};
