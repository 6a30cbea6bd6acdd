//! Command-line entry point of barcode-collapse.

use anyhow::Result;
use barcode_collapse::cli::{run_cli, Cli};
use clap::Parser;
use log::LevelFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG, when set, overrides the verbosity flag.
    let level = if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    run_cli(cli)
}
