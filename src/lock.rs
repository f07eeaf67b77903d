//! Whole-file advisory locks.
//!
//! `flock(2)` semantics via fs2:
//! - Shared: any number of holders, excludes Exclusive.
//! - Exclusive: single holder.
//! - Unlock: drops whatever this descriptor holds.
//!
//! Locks belong to the open file (not to the path and not to the process),
//! so two descriptors opened separately exclude each other even inside one
//! process. The stale lock file protocol in `lockfile` depends on this.

use std::fs::File;
use std::io::{self, ErrorKind};

use fs2::FileExt;
use log::debug;

use crate::error::{LockError, Result};
use crate::interrupt::Interrupt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockType {
    /// Release (`LOCK_UN`).
    Unlock,
    /// Read lock (`LOCK_SH`).
    Shared,
    /// Write lock (`LOCK_EX`).
    Exclusive,
}

impl LockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockType::Unlock => "unlock",
            LockType::Shared => "shared",
            LockType::Exclusive => "exclusive",
        }
    }
}

/// Something that can carry a whole-file advisory lock.
///
/// Implemented for [`File`]; the seam also lets tests script failures
/// (`EINTR`, `EWOULDBLOCK`, I/O errors) that are hard to provoke for real.
pub trait AdvisoryLock {
    /// One raw attempt. `wait = false` must fail with
    /// [`ErrorKind::WouldBlock`] instead of suspending.
    fn flock(&self, lock_type: LockType, wait: bool) -> io::Result<()>;
}

impl AdvisoryLock for File {
    fn flock(&self, lock_type: LockType, wait: bool) -> io::Result<()> {
        // Fully qualified: std's own File::lock_shared/unlock would shadow fs2.
        match (lock_type, wait) {
            (LockType::Unlock, _) => FileExt::unlock(self),
            (LockType::Shared, true) => FileExt::lock_shared(self),
            (LockType::Shared, false) => FileExt::try_lock_shared(self),
            (LockType::Exclusive, true) => FileExt::lock_exclusive(self),
            (LockType::Exclusive, false) => FileExt::try_lock_exclusive(self),
        }
    }
}

impl<T: AdvisoryLock + ?Sized> AdvisoryLock for &T {
    fn flock(&self, lock_type: LockType, wait: bool) -> io::Result<()> {
        (**self).flock(lock_type, wait)
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Acquire or release an advisory lock on `fd`.
///
/// Returns `Ok(true)` once the requested state is established and `Ok(false)`
/// only when a non-blocking attempt finds the lock held elsewhere. A pending
/// cancellation on `interrupt` is noticed after any failed attempt and
/// reported as [`LockError::Interrupted`]. An `EINTR` that is not a
/// cancellation is retried in both modes. Anything else is fatal.
pub fn lock_file<L>(fd: &L, lock_type: LockType, wait: bool, interrupt: &Interrupt) -> Result<bool>
where
    L: AdvisoryLock + ?Sized,
{
    loop {
        let err = match fd.flock(lock_type, wait) {
            Ok(()) => return Ok(true),
            Err(e) => e,
        };

        interrupt.check()?;

        if err.kind() == ErrorKind::Interrupted {
            debug!("{} lock attempt interrupted by a signal, retrying", lock_type.as_str());
            continue;
        }
        if !wait && is_contended(&err) {
            return Ok(false);
        }
        return Err(LockError::Lock(err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::fs::OpenOptions;

    /// Replays a scripted sequence of outcomes (None = success).
    struct Scripted {
        outcomes: RefCell<VecDeque<Option<ErrorKind>>>,
        calls: RefCell<Vec<(LockType, bool)>>,
    }

    impl Scripted {
        fn new(outcomes: &[Option<ErrorKind>]) -> Self {
            Self {
                outcomes: RefCell::new(outcomes.iter().copied().collect()),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(LockType, bool)> {
            self.calls.borrow().clone()
        }
    }

    impl AdvisoryLock for Scripted {
        fn flock(&self, lock_type: LockType, wait: bool) -> io::Result<()> {
            self.calls.borrow_mut().push((lock_type, wait));
            match self.outcomes.borrow_mut().pop_front().flatten() {
                None => Ok(()),
                Some(kind) => Err(io::Error::from(kind)),
            }
        }
    }

    #[test]
    fn blocking_retries_after_spurious_interrupt() {
        let fd = Scripted::new(&[Some(ErrorKind::Interrupted), Some(ErrorKind::Interrupted), None]);
        let ok = lock_file(&fd, LockType::Exclusive, true, &Interrupt::new()).unwrap();
        assert!(ok);
        assert_eq!(fd.calls(), vec![(LockType::Exclusive, true); 3]);
    }

    #[test]
    fn non_blocking_retries_after_spurious_interrupt() {
        let fd = Scripted::new(&[Some(ErrorKind::Interrupted), None]);
        let ok = lock_file(&fd, LockType::Shared, false, &Interrupt::new()).unwrap();
        assert!(ok);
        assert_eq!(fd.calls(), vec![(LockType::Shared, false); 2]);
    }

    #[test]
    fn non_blocking_contended_returns_false() {
        let fd = Scripted::new(&[Some(ErrorKind::Interrupted), Some(ErrorKind::WouldBlock)]);
        let ok = lock_file(&fd, LockType::Exclusive, false, &Interrupt::new()).unwrap();
        assert!(!ok);
        assert_eq!(fd.calls().len(), 2);
    }

    #[test]
    fn cancellation_aborts_blocking_wait() {
        let interrupt = Interrupt::new();
        interrupt.trigger();
        let fd = Scripted::new(&[Some(ErrorKind::Interrupted), None]);
        let err = lock_file(&fd, LockType::Exclusive, true, &interrupt).unwrap_err();
        assert!(err.is_interrupted());
        assert_eq!(fd.calls().len(), 1);
    }

    #[test]
    fn cancellation_wins_over_contention() {
        let interrupt = Interrupt::new();
        interrupt.trigger();
        let fd = Scripted::new(&[Some(ErrorKind::WouldBlock)]);
        let err = lock_file(&fd, LockType::Exclusive, false, &interrupt).unwrap_err();
        assert!(matches!(err, LockError::Interrupted));
    }

    #[test]
    fn pending_cancellation_does_not_undo_success() {
        let interrupt = Interrupt::new();
        interrupt.trigger();
        let fd = Scripted::new(&[None]);
        assert!(lock_file(&fd, LockType::Exclusive, true, &interrupt).unwrap());
    }

    #[test]
    fn other_failures_are_fatal_in_both_modes() {
        let fd = Scripted::new(&[Some(ErrorKind::InvalidInput)]);
        let err = lock_file(&fd, LockType::Exclusive, true, &Interrupt::new()).unwrap_err();
        assert!(matches!(err, LockError::Lock(_)));

        let fd = Scripted::new(&[Some(ErrorKind::PermissionDenied)]);
        let err = lock_file(&fd, LockType::Shared, false, &Interrupt::new()).unwrap_err();
        assert!(matches!(err, LockError::Lock(_)));
    }

    #[test]
    fn blocking_mode_does_not_treat_would_block_as_contention() {
        let fd = Scripted::new(&[Some(ErrorKind::WouldBlock)]);
        let err = lock_file(&fd, LockType::Exclusive, true, &Interrupt::new()).unwrap_err();
        assert!(matches!(err, LockError::Lock(_)));
    }

    fn open_rw(path: &std::path::Path) -> File {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .unwrap()
    }

    #[test]
    fn real_files_exclusive_excludes_shared_and_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.lock");
        let a = open_rw(&path);
        let b = open_rw(&path);
        let none = Interrupt::new();

        assert!(lock_file(&a, LockType::Exclusive, false, &none).unwrap());
        assert!(!lock_file(&b, LockType::Exclusive, false, &none).unwrap());
        assert!(!lock_file(&b, LockType::Shared, false, &none).unwrap());

        assert!(lock_file(&a, LockType::Unlock, false, &none).unwrap());
        assert!(lock_file(&b, LockType::Exclusive, false, &none).unwrap());
    }

    #[test]
    fn real_files_shared_locks_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.lock");
        let a = open_rw(&path);
        let b = open_rw(&path);
        let c = open_rw(&path);
        let none = Interrupt::new();

        assert!(lock_file(&a, LockType::Shared, false, &none).unwrap());
        assert!(lock_file(&b, LockType::Shared, false, &none).unwrap());
        assert!(!lock_file(&c, LockType::Exclusive, false, &none).unwrap());
    }
}
