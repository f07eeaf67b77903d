//! Advisory path locks for processes sharing a content-addressed store.
//!
//! Processes coordinate only through the filesystem: each protected path `P`
//! has a lock file `P.lock` carrying a whole-file `flock`. No daemon, no
//! shared memory.
//!
//! - [`PathLocks`]: exclusive locks over a set of paths, taken in a fixed
//!   global order, released together (also on drop).
//! - [`FdLock`]: one lock on a descriptor someone else owns.
//! - [`lock_file`]: the underlying acquire/release primitive.
//! - [`Interrupt`]: cooperative cancellation for every wait.

// Базовые модули
pub mod consts;
pub mod error;
pub mod interrupt;
pub mod config;
pub mod metrics;

// Locking
pub mod lock;
pub mod lockfile;
pub mod pathlocks;
pub mod fdlock;
pub mod probe;

// Удобные реэкспорты
pub use config::LockConfig;
pub use error::{LockError, Result};
pub use fdlock::FdLock;
pub use interrupt::Interrupt;
pub use lock::{lock_file, AdvisoryLock, LockType};
pub use lockfile::{delete_lock_file, lock_path_for, open_lock_file};
pub use pathlocks::{HeldLock, PathLocks};
pub use probe::{probe, LockState};
