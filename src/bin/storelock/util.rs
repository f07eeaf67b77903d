use anyhow::{anyhow, Context, Result};
use std::process::Command;

use log::debug;

/// Run `argv` in the foreground and return its exit code.
pub fn run_command(argv: &[String]) -> Result<i32> {
    let (prog, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("no command given"))?;
    debug!("running {:?}", argv);
    let status = Command::new(prog)
        .args(args)
        .status()
        .with_context(|| format!("spawn {}", prog))?;
    // Killed by a signal: shell convention 128+N is not portable here, use 1.
    Ok(status.code().unwrap_or(1))
}
