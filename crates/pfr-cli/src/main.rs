//! puppetfile-resolver binary.
//!
//! Parses arguments with `clap`, initializes logging via `tracing` and runs
//! the resolution. Stdout carries only the DOT graph and validation lines;
//! logs and progress go to stderr.

mod cli;
mod commands;
mod ui;

use miette::Result;

fn main() -> Result<()> {
    let args = cli::parse();

    let filter = if args.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    commands::dispatch(args)
}
