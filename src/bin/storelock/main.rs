use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::error;

mod cli;
mod util;
mod cmd_run;
mod cmd_fd;
mod cmd_probe;

fn init_logger() {
    // Level from RUST_LOG, info by default.
    // Example: RUST_LOG=debug storelock run --path /store/x -- true
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Run { paths, no_wait, wait_msg, delete, command } =>
            cmd_run::exec(paths, no_wait, wait_msg, delete, command),

        cli::Cmd::Fd { file, shared, no_wait, wait_msg, command } =>
            cmd_fd::exec(file, shared, no_wait, wait_msg, command),

        cli::Cmd::Probe { path, json } => {
            cmd_probe::exec(path, json)?;
            Ok(0)
        }
    }
}
