//! Acquisition event emitter port.
//!
//! This port abstracts event emission, allowing the engine to announce job
//! state changes without coupling to transport details (SSE, Tauri, etc.).

use crate::acquire::AcquireEvent;

/// Port for emitting acquisition events.
///
/// Implementations handle the actual event delivery (channels, SSE, UI
/// events). `emit` must not block; buffer or drop under pressure.
pub trait AcquireEventEmitterPort: Send + Sync {
    /// Emit an acquisition event.
    fn emit(&self, event: AcquireEvent);

    /// Clone this emitter into a boxed trait object.
    ///
    /// This enables cloning of `Arc<dyn AcquireEventEmitterPort>` without
    /// requiring the underlying type to implement Clone.
    fn clone_box(&self) -> Box<dyn AcquireEventEmitterPort>;
}

/// A no-op event emitter for tests and polling-only embedders.
///
/// The engine is fully usable without push events; clients can observe
/// everything through progress polling alone.
#[derive(Debug, Clone, Default)]
pub struct NoopAcquireEmitter;

impl NoopAcquireEmitter {
    /// Create a new no-op emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AcquireEventEmitterPort for NoopAcquireEmitter {
    fn emit(&self, _event: AcquireEvent) {
        // Intentionally do nothing
    }

    fn clone_box(&self) -> Box<dyn AcquireEventEmitterPort> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::ContentKey;
    use std::sync::Arc;

    #[test]
    fn test_noop_emitter() {
        let emitter = NoopAcquireEmitter::new();
        let key = ContentKey::new("abc123").unwrap();

        // Should not panic
        emitter.emit(AcquireEvent::started(&key));
    }

    #[test]
    fn test_noop_emitter_clone_box() {
        let emitter = NoopAcquireEmitter::new();
        let _boxed: Box<dyn AcquireEventEmitterPort> = emitter.clone_box();
    }

    #[test]
    fn test_arc_emitter() {
        let emitter: Arc<dyn AcquireEventEmitterPort> = Arc::new(NoopAcquireEmitter::new());
        let key = ContentKey::new("abc123").unwrap();
        emitter.emit(AcquireEvent::cancelled(&key));
    }
}
