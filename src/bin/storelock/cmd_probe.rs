use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use storelock::{lock_path_for, probe, LockState};

#[derive(Serialize)]
struct ProbeReport {
    path: PathBuf,
    lock_path: PathBuf,
    state: LockState,
}

pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    let state = probe(&path)?;
    let report = ProbeReport {
        lock_path: lock_path_for(&path),
        path,
        state,
    };

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("path:      {}", report.path.display());
        println!("lock file: {}", report.lock_path.display());
        println!("state:     {}", report.state);
    }
    Ok(())
}
