use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Advisory store path locks from the shell
#[derive(Parser, Debug)]
#[command(name = "storelock", version, about = "Advisory store path locks", arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Lock a set of store paths and run a command while holding them
    Run {
        /// Protected path (repeatable); `<path>.lock` is the lock file
        #[arg(long = "path", required = true)]
        paths: Vec<PathBuf>,
        /// Fail instead of waiting when a path is locked
        #[arg(long)]
        no_wait: bool,
        /// Notice printed when a path is busy
        #[arg(long)]
        wait_msg: Option<String>,
        /// Delete the lock files on release
        #[arg(long)]
        delete: bool,
        /// Command and arguments
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
    /// Lock an existing file (flock style) and run a command
    Fd {
        #[arg(long)]
        file: PathBuf,
        /// Shared instead of exclusive
        #[arg(long)]
        shared: bool,
        #[arg(long)]
        no_wait: bool,
        #[arg(long)]
        wait_msg: Option<String>,
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
    /// Show the state of a path's lock file
    Probe {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
}
