//! Cooperative abort flag shared by a run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable flag checked between fingerprint chunks and before every
/// manifest commit. Raising it makes in-flight work stop without replacing
/// any manifest.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    /// Shared flag.
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Creates a handle that is not raised.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag for every clone of this handle.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`AbortHandle::abort`] was called on any clone.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
