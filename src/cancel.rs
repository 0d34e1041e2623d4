//! Cooperative cancellation.
//!
//! Long-running operations (the rebase continuation loop, fetch) check
//! the flag between commit-level steps. A cancelled rebase or
//! cherry-pick leaves its operation files in place, which is exactly the
//! resume contract for `--continue`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A fresh, unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Reset for reuse by the next command.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}
