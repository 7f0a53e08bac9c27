#![warn(rust_2018_idioms, unused_lifetimes)]
#![allow(clippy::print_stderr, clippy::print_stdout)]

pub mod handlers;
pub mod models;

use crate::handlers::{autoconfig, manifest, testing};
use crate::models::args::{Cli, Commands};

use anyhow::{Context, Result};
use clap::Parser;
use pgpack_domain::config::HarnessConfig;
use pgpack_kernel::config::load_config;
use pgpack_logger::{LevelFilter, Logger, Stream};
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;

#[pgpack_runtime::main(memory_efficient)]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Inside the container the entrypoint output lands in `docker logs` verbatim.
    let in_container = matches!(cli.command, Commands::Autoconfig(_));
    let _log = init_logger(cli.verbose, cli.log_dir.as_deref(), in_container)?;

    match cli.command {
        Commands::Autoconfig(args) => autoconfig::run(&args),
        Commands::Manifest { manifest: path, action } => {
            let path = match path {
                Some(path) => path,
                None => harness_config(cli.config.as_deref())?.manifest.path.clone(),
            };
            manifest::run(&action, &path)
        },
        Commands::Test { suite } => testing::run(harness_config(cli.config.as_deref())?, suite).await,
    }
}

fn harness_config(path: Option<&Path>) -> Result<HarnessConfig> {
    load_config(path).context("Critical: Configuration is malformed")
}

fn init_logger(verbose: bool, log_dir: Option<&Path>, plain: bool) -> Result<Logger> {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let builder = Logger::builder()
        .name(env!("CARGO_BIN_NAME"))
        .level(level)
        .stream(Stream::Stderr)
        .timestamps(!plain)
        .ansi(!plain && std::io::stderr().is_terminal());

    match log_dir {
        Some(dir) => builder.path(dir).init(),
        None => builder.init(),
    }
    .context("Failed to initialize logging")
}
