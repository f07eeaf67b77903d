use anyhow::{anyhow, Result};
use std::path::PathBuf;

use log::debug;

use storelock::{metrics, LockConfig, PathLocks};

use crate::util::run_command;

pub fn exec(
    paths: Vec<PathBuf>,
    no_wait: bool,
    wait_msg: Option<String>,
    delete: bool,
    command: Vec<String>,
) -> Result<i32> {
    let mut cfg = LockConfig::from_env();
    if no_wait {
        cfg = cfg.with_wait(false);
    }
    if delete {
        cfg = cfg.with_delete_on_release(true);
    }
    if wait_msg.is_some() {
        cfg = cfg.with_wait_msg(wait_msg);
    }
    debug!("{}", cfg);

    // No interrupt token: SIGINT terminates the process while it waits, and
    // the kernel drops any lock it already held.
    let locks = PathLocks::acquire(&paths, &cfg)?
        .ok_or_else(|| anyhow!("some paths are locked by another process"))?;

    let code = run_command(&command)?;

    drop(locks);
    debug!("lock metrics: {:?}", metrics::snapshot());
    Ok(code)
}
