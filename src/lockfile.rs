//! Lock files beside protected paths.
//!
//! The lock for `<path>` lives in `<path>.lock`. A live lock file is empty.
//! Before a holder deletes one it writes [`STALE_MARKER`] into it, so a
//! process already blocked on the same (now unlinked) file sees a nonzero
//! size once it gets the lock and knows to start over with a fresh file.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::consts::{LOCK_FILE_MODE, LOCK_SUFFIX, STALE_MARKER};
use crate::error::{LockError, Result};

/// `<path>.lock`, appended byte-wise (`a.b` becomes `a.b.lock`).
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(LOCK_SUFFIX);
    PathBuf::from(s)
}

/// Open a lock file read/write, creating it (mode 0600) if `create` is set.
///
/// A missing file without `create` is `Ok(None)`, not an error.
pub fn open_lock_file(path: &Path, create: bool) -> Result<Option<File>> {
    let mut opts = OpenOptions::new();
    opts.read(true).write(true).create(create).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(LOCK_FILE_MODE);
    }

    match opts.open(path) {
        Ok(f) => Ok(Some(f)),
        Err(e) if !create && e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LockError::io("opening", path, e)),
    }
}

/// Unlink `path` and mark the still-open `file` as stale.
///
/// Call only while holding the lock on `file`, right before releasing it.
/// A failed unlink is ignored: removing the name only saves disk clutter,
/// the marker is what waiters rely on.
pub fn delete_lock_file(path: &Path, mut file: &File) -> Result<()> {
    if let Err(e) = fs::remove_file(path) {
        debug!("cannot unlink lock file '{}' (ignored): {}", path.display(), e);
    }
    file.write_all(STALE_MARKER)
        .map_err(|e| LockError::io("marking stale", path, e))
}

/// True if `path` currently names the same file as the open `file`.
///
/// Any failure to stat the name counts as "not the same file".
#[cfg(unix)]
pub(crate) fn still_named(path: &Path, file: &File) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::metadata(path), file.metadata()) {
        (Ok(on_disk), Ok(open)) => on_disk.dev() == open.dev() && on_disk.ino() == open.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
pub(crate) fn still_named(_path: &Path, _file: &File) -> bool {
    false
}

/// Current size of an open lock file; nonzero means stale.
pub(crate) fn lock_file_len(path: &Path, file: &File) -> Result<u64> {
    file.metadata()
        .map(|m| m.len())
        .map_err(|e| LockError::io("statting", path, e))
}
