//! On-disk conventions shared by every lock file.

// -------- Naming --------
/// Suffix appended (byte-wise) to a protected path to get its lock file.
pub const LOCK_SUFFIX: &str = ".lock";

// -------- Format --------
/// Written into a lock file right before it is released and unlinked.
/// A valid lock file is always empty; any content means "stale".
pub const STALE_MARKER: &[u8] = b"d";

// -------- Permissions --------
pub const LOCK_FILE_MODE: u32 = 0o600;

// -------- Env --------
pub const ENV_DELETE_ON_RELEASE: &str = "STORELOCK_DELETE_ON_RELEASE";
pub const ENV_WAIT: &str = "STORELOCK_WAIT";
pub const ENV_WAIT_MSG: &str = "STORELOCK_WAIT_MSG";
