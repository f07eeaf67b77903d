use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;

use storelock::{FdLock, LockType};

use crate::util::run_command;

pub fn exec(
    file: PathBuf,
    shared: bool,
    no_wait: bool,
    wait_msg: Option<String>,
    command: Vec<String>,
) -> Result<i32> {
    let f = OpenOptions::new()
        .read(true)
        .open(&file)
        .with_context(|| format!("open {}", file.display()))?;

    let lock_type = if shared { LockType::Shared } else { LockType::Exclusive };
    let msg = wait_msg.unwrap_or_else(|| format!("waiting for {} lock on '{}'...", lock_type.as_str(), file.display()));
    let guard = FdLock::new(&f, lock_type, !no_wait, &msg)?;
    if !guard.acquired() {
        return Err(anyhow!("'{}' is locked by another process", file.display()));
    }

    // The lock lives as long as `f`, which outlives the child.
    run_command(&command)
}
