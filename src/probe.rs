//! Read-only inspection of a path's lock file.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::interrupt::Interrupt;
use crate::lock::{lock_file, LockType};
use crate::lockfile::{lock_file_len, lock_path_for, open_lock_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    /// No lock file exists.
    Absent,
    /// The lock file carries the stale marker.
    Stale,
    /// The lock file exists and nobody holds it.
    Free,
    /// Someone holds a shared lock.
    Shared,
    /// Someone holds an exclusive lock.
    Exclusive,
}

impl LockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockState::Absent => "absent",
            LockState::Stale => "stale",
            LockState::Free => "free",
            LockState::Shared => "shared",
            LockState::Exclusive => "exclusive",
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report the state of the lock guarding `path`.
///
/// Never creates a lock file; any lock taken to find out is dropped before
/// returning. The answer can be outdated as soon as it is returned.
///
/// Telling [`LockState::Free`] from [`LockState::Shared`] takes a brief
/// non-blocking lock, so it may make a concurrent non-blocking locker see
/// contention. Waiting lockers are unaffected.
pub fn probe(path: &Path) -> Result<LockState> {
    let lock_path = lock_path_for(path);
    let file = match open_lock_file(&lock_path, false)? {
        Some(f) => f,
        None => return Ok(LockState::Absent),
    };

    if lock_file_len(&lock_path, &file)? != 0 {
        return Ok(LockState::Stale);
    }

    let none = Interrupt::new();
    if lock_file(&file, LockType::Exclusive, false, &none)? {
        return Ok(LockState::Free);
    }
    if lock_file(&file, LockType::Shared, false, &none)? {
        return Ok(LockState::Shared);
    }
    Ok(LockState::Exclusive)
}
