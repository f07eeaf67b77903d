//! Cooperative cancellation for lock waits.
//!
//! A blocking lock wait cannot be preempted from inside the process; instead
//! every retry of a wait loop (and every path of a lock set) polls an
//! [`Interrupt`]. Whoever owns a clone can request cancellation, e.g. a signal
//! handler thread or a supervisor shutting down a worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{LockError, Result};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every wait polling this token.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear a previous request so the token can be reused.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Fail with [`LockError::Interrupted`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_triggered() {
            return Err(LockError::Interrupted);
        }
        Ok(())
    }
}
