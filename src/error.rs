//! Error type for every lock operation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from locking operations.
///
/// Expected outcomes (a contended non-blocking attempt, a stale lock file)
/// are not errors; they surface as `Ok(false)` or as an internal retry.
#[derive(Debug, Error)]
pub enum LockError {
    /// A cooperative cancellation was requested while acquiring.
    #[error("interrupted by the user")]
    Interrupted,

    /// Opening, inspecting or writing a lock file failed.
    #[error("{op} lock file '{}': {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The advisory lock call itself failed.
    #[error("acquiring/releasing lock: {0}")]
    Lock(#[source] io::Error),

    /// `lock_paths` was called on a lock set that still holds locks.
    #[error("lock set already holds {held} lock(s); release them first")]
    AlreadyHolding { held: usize },
}

impl LockError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        LockError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// True for a cancellation, as opposed to an OS failure.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, LockError::Interrupted)
    }
}

pub type Result<T> = std::result::Result<T, LockError>;
