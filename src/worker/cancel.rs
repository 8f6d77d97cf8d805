// Fri Jan 17 2026 - Alex

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "still enabled" flag. Workers check it once per loop iteration.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
