//! Lightweight process-wide lock metrics.
//!
//! Atomic counters for:
//! - acquisitions (path locks and descriptor locks)
//! - contention (non-blocking misses, blocking waits)
//! - stale lock files observed and retried
//! - rollbacks of partially acquired lock sets
//! - releases and best-effort release failures

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// ----- Acquire -----
static LOCKS_ACQUIRED: AtomicU64 = AtomicU64::new(0);
static LOCKS_CONTENDED: AtomicU64 = AtomicU64::new(0);
static LOCK_WAITS: AtomicU64 = AtomicU64::new(0);
static STALE_RETRIES: AtomicU64 = AtomicU64::new(0);
static ROLLBACKS: AtomicU64 = AtomicU64::new(0);

// ----- Release -----
static LOCKS_RELEASED: AtomicU64 = AtomicU64::new(0);
static LOCK_FILES_DELETED: AtomicU64 = AtomicU64::new(0);
static RELEASE_ERRORS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    // Acquire
    pub locks_acquired: u64,
    pub locks_contended: u64,
    pub lock_waits: u64,
    pub stale_retries: u64,
    pub rollbacks: u64,

    // Release
    pub locks_released: u64,
    pub lock_files_deleted: u64,
    pub release_errors: u64,
}

impl MetricsSnapshot {
    /// Share of acquisitions that found the lock taken on the first try.
    pub fn contention_ratio(&self) -> f64 {
        let total = self.locks_acquired + self.locks_contended;
        if total == 0 {
            0.0
        } else {
            self.locks_contended as f64 / total as f64
        }
    }
}

// ----- Recorders (Acquire) -----
pub fn record_acquired() {
    LOCKS_ACQUIRED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_contended() {
    LOCKS_CONTENDED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_wait() {
    LOCK_WAITS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_stale_retry() {
    STALE_RETRIES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_rollback() {
    ROLLBACKS.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Release) -----
pub fn record_released() {
    LOCKS_RELEASED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_deleted() {
    LOCK_FILES_DELETED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_release_error() {
    RELEASE_ERRORS.fetch_add(1, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        locks_acquired: LOCKS_ACQUIRED.load(Ordering::Relaxed),
        locks_contended: LOCKS_CONTENDED.load(Ordering::Relaxed),
        lock_waits: LOCK_WAITS.load(Ordering::Relaxed),
        stale_retries: STALE_RETRIES.load(Ordering::Relaxed),
        rollbacks: ROLLBACKS.load(Ordering::Relaxed),

        locks_released: LOCKS_RELEASED.load(Ordering::Relaxed),
        lock_files_deleted: LOCK_FILES_DELETED.load(Ordering::Relaxed),
        release_errors: RELEASE_ERRORS.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    LOCKS_ACQUIRED.store(0, Ordering::Relaxed);
    LOCKS_CONTENDED.store(0, Ordering::Relaxed);
    LOCK_WAITS.store(0, Ordering::Relaxed);
    STALE_RETRIES.store(0, Ordering::Relaxed);
    ROLLBACKS.store(0, Ordering::Relaxed);

    LOCKS_RELEASED.store(0, Ordering::Relaxed);
    LOCK_FILES_DELETED.store(0, Ordering::Relaxed);
    RELEASE_ERRORS.store(0, Ordering::Relaxed);
}
