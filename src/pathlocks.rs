//! Exclusive locks over sets of store paths.
//!
//! Every path `P` is guarded by an exclusive lock on `P.lock`. A [`PathLocks`]
//! acquires a whole set of them and releases them together.
//!
//! # Deadlock avoidance
//!
//! Paths are always locked in byte-wise lexicographic order, whatever order
//! the caller supplied them in. Two processes locking overlapping sets through
//! [`PathLocks::lock_paths`] therefore never wait on each other in a cycle.
//! Locking paths one at a time through anything else voids that guarantee.
//!
//! # Invariants
//!
//! - Only fully acquired locks are ever recorded in the held set.
//! - A call to `lock_paths` that does not return `Ok(true)` leaves nothing held.
//! - Dropping a `PathLocks` releases everything it holds.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, error, warn};

use crate::config::LockConfig;
use crate::error::{LockError, Result};
use crate::interrupt::Interrupt;
use crate::lock::{lock_file, LockType};
use crate::lockfile::{delete_lock_file, lock_file_len, lock_path_for, open_lock_file, still_named};
use crate::metrics;

/// One acquired lock: the open lock file and the name it was opened through.
#[derive(Debug)]
pub struct HeldLock {
    file: File,
    lock_path: PathBuf,
}

impl HeldLock {
    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

/// A set of exclusive path locks held by this process.
#[derive(Debug, Default)]
pub struct PathLocks {
    fds: Vec<HeldLock>,
    delete_paths: bool,
    interrupt: Interrupt,
}

/// Sorted, de-duplicated by raw bytes (not by path components), so that
/// "a-b" < "a/b" < "ab" regardless of how the caller spelled the set.
fn sorted_unique<I, P>(paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let set: BTreeSet<OsString> = paths
        .into_iter()
        .map(|p| p.as_ref().as_os_str().to_owned())
        .collect();
    set.into_iter().map(PathBuf::from).collect()
}

impl PathLocks {
    /// Empty lock set; lock files are kept on release.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(cfg: &LockConfig) -> Self {
        Self {
            fds: Vec::new(),
            delete_paths: cfg.delete_on_release,
            interrupt: Interrupt::new(),
        }
    }

    /// Poll `interrupt` while acquiring instead of a private token.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Lock `paths`, waiting as long as it takes.
    pub fn lock<I, P>(paths: I, wait_msg: Option<&str>) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut locks = Self::new();
        locks.lock_paths(paths, wait_msg, true)?;
        Ok(locks)
    }

    /// Lock `paths` following `cfg`.
    ///
    /// Returns `Ok(None)` when `cfg.wait` is off and some path was busy.
    pub fn acquire<I, P>(paths: I, cfg: &LockConfig) -> Result<Option<Self>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut locks = Self::with_config(cfg);
        if locks.lock_paths(paths, cfg.wait_msg.as_deref(), cfg.wait)? {
            Ok(Some(locks))
        } else {
            Ok(None)
        }
    }

    /// Acquire exclusive locks on all of `paths`.
    ///
    /// With `wait`, contended paths are waited for (logging `wait_msg` once per
    /// contended path). Without it, the first busy path makes the call release
    /// everything it took and return `Ok(false)`. On error everything taken so
    /// far is released as well.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyHolding`] if this set still holds locks
    /// - [`LockError::Interrupted`] if the interrupt token fires
    /// - [`LockError::Io`] / [`LockError::Lock`] on OS failures
    pub fn lock_paths<I, P>(&mut self, paths: I, wait_msg: Option<&str>, wait: bool) -> Result<bool>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        if !self.fds.is_empty() {
            return Err(LockError::AlreadyHolding {
                held: self.fds.len(),
            });
        }

        let paths = sorted_unique(paths);
        let outcome = self.lock_sorted(&paths, wait_msg, wait);
        if !matches!(outcome, Ok(true)) {
            if !self.fds.is_empty() {
                metrics::record_rollback();
            }
            self.unlock();
        }
        outcome
    }

    fn lock_sorted(&mut self, paths: &[PathBuf], wait_msg: Option<&str>, wait: bool) -> Result<bool> {
        for path in paths {
            let lock_path = lock_path_for(path);

            debug!("locking path '{}'", path.display());

            let file = loop {
                self.interrupt.check()?;

                let file = open_lock_file(&lock_path, true)?.ok_or_else(|| {
                    LockError::io("opening", &lock_path, io::Error::from(io::ErrorKind::NotFound))
                })?;

                if !lock_file(&file, LockType::Exclusive, false, &self.interrupt)? {
                    metrics::record_contended();
                    if !wait {
                        debug!("path '{}' is locked by another holder", path.display());
                        return Ok(false);
                    }
                    if let Some(msg) = wait_msg.filter(|m| !m.is_empty()) {
                        warn!("{}", msg);
                    }
                    metrics::record_wait();
                    lock_file(&file, LockType::Exclusive, true, &self.interrupt)?;
                }

                debug!("lock acquired on '{}'", lock_path.display());

                // A nonzero size means the holder we waited for deleted this
                // file; others may already hold a fresh one under the same name.
                if lock_file_len(&lock_path, &file)? != 0 {
                    debug!("open lock file '{}' has become stale", lock_path.display());
                    metrics::record_stale_retry();
                    // Still under the name (a holder failed to unlink it):
                    // remove it while its lock is held here.
                    // Retrying on a name that cannot be removed would never end.
                    if still_named(&lock_path, &file) {
                        fs::remove_file(&lock_path)
                            .map_err(|e| LockError::io("removing stale", &lock_path, e))?;
                    }
                    continue;
                }
                break file;
            };

            metrics::record_acquired();
            self.fds.push(HeldLock { file, lock_path });
        }

        Ok(true)
    }

    /// Release every held lock, deleting the lock files if deletion is on.
    ///
    /// Never fails: a lock file that cannot be deleted is logged and skipped,
    /// the kernel drops the advisory lock with the descriptor anyway.
    pub fn unlock(&mut self) {
        for held in self.fds.drain(..) {
            if self.delete_paths {
                match delete_lock_file(&held.lock_path, &held.file) {
                    Ok(()) => metrics::record_deleted(),
                    Err(e) => {
                        metrics::record_release_error();
                        error!("error (ignored): {}", e);
                    }
                }
            }

            // Closing releases the advisory lock; std discards close(2) errors.
            drop(held.file);

            metrics::record_released();
            debug!("lock released on '{}'", held.lock_path.display());
        }
    }

    /// Delete lock files when releasing (off by default).
    pub fn set_deletion(&mut self, delete_paths: bool) {
        self.delete_paths = delete_paths;
    }

    pub fn deletion(&self) -> bool {
        self.delete_paths
    }

    pub fn len(&self) -> usize {
        self.fds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }

    /// Held locks in acquisition (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = &HeldLock> {
        self.fds.iter()
    }
}

impl Drop for PathLocks {
    fn drop(&mut self) {
        self.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::STALE_MARKER;

    #[test]
    fn sorted_unique_is_bytewise() {
        let got = sorted_unique(["/s/ab", "/s/a/b", "/s/a-b", "/s/ab", "/s/a"]);
        let want: Vec<PathBuf> = ["/s/a", "/s/a-b", "/s/a/b", "/s/ab"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(got, want);
    }

    #[test]
    fn lock_and_unlock_single_path() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("pkg");

        let mut locks = PathLocks::new();
        assert!(locks.lock_paths([&p], None, false).unwrap());
        assert_eq!(locks.len(), 1);
        let held = locks.iter().next().unwrap();
        assert_eq!(held.lock_path(), lock_path_for(&p));
        assert!(!p.exists(), "protected path must not be touched");

        locks.unlock();
        assert!(locks.is_empty());
        assert!(lock_path_for(&p).exists(), "kept without deletion");
    }

    #[test]
    fn second_call_while_holding_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("pkg");

        let mut locks = PathLocks::new();
        assert!(locks.lock_paths([&p], None, false).unwrap());
        let err = locks.lock_paths([&p], None, false).unwrap_err();
        assert!(matches!(err, LockError::AlreadyHolding { held: 1 }));
        assert_eq!(locks.len(), 1, "existing locks untouched");
    }

    #[test]
    fn deletion_removes_lock_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");

        let mut locks = PathLocks::with_config(&LockConfig::default().with_delete_on_release(true));
        assert!(locks.deletion());
        assert!(locks.lock_paths([&b, &a], None, true).unwrap());
        let order: Vec<PathBuf> = locks.iter().map(|h| h.lock_path().to_path_buf()).collect();
        assert_eq!(order, vec![lock_path_for(&a), lock_path_for(&b)]);

        drop(locks);
        assert!(!lock_path_for(&a).exists());
        assert!(!lock_path_for(&b).exists());
    }

    #[test]
    fn triggered_interrupt_fails_before_locking() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("pkg");
        let interrupt = Interrupt::new();
        interrupt.trigger();

        let mut locks = PathLocks::new().with_interrupt(interrupt);
        let err = locks.lock_paths([&p], None, true).unwrap_err();
        assert!(err.is_interrupted());
        assert!(locks.is_empty());
        assert!(!lock_path_for(&p).exists());
    }

    #[test]
    fn leftover_marker_at_the_name_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("pkg");

        for wait in [false, true] {
            fs::write(lock_path_for(&p), STALE_MARKER).unwrap();

            let mut locks = PathLocks::new();
            assert!(locks.lock_paths([&p], None, wait).unwrap());
            let held = locks.iter().next().unwrap();
            assert_eq!(held.file().metadata().unwrap().len(), 0);
            assert!(still_named(&lock_path_for(&p), held.file()));
        }
    }

    #[test]
    fn triggered_interrupt_leaves_leftover_marker_alone() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("pkg");
        fs::write(lock_path_for(&p), STALE_MARKER).unwrap();
        let interrupt = Interrupt::new();
        interrupt.trigger();

        let mut locks = PathLocks::new().with_interrupt(interrupt);
        let err = locks.lock_paths([&p], None, false).unwrap_err();
        assert!(err.is_interrupted());
        assert!(locks.is_empty());
        assert_eq!(fs::metadata(lock_path_for(&p)).unwrap().len(), STALE_MARKER.len() as u64);
    }

    #[test]
    fn fatal_error_rolls_back_earlier_locks() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("a-ok");
        // Parent directory does not exist: opening its lock file fails.
        let bad = dir.path().join("b-missing-dir").join("pkg");

        let mut locks = PathLocks::new();
        let err = locks.lock_paths([&ok, &bad], None, true).unwrap_err();
        assert!(matches!(err, LockError::Io { .. }));
        assert!(locks.is_empty());

        let mut other = PathLocks::new();
        assert!(other.lock_paths([&ok], None, false).unwrap());
    }

    #[test]
    fn empty_set_trivially_succeeds() {
        let mut locks = PathLocks::new();
        assert!(locks.lock_paths(Vec::<PathBuf>::new(), None, false).unwrap());
        assert!(locks.is_empty());
    }
}
