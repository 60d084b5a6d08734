//! tlsdecrypt CLI entry point.

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tlsdecrypt::cli::{decrypt_records, list_suites, summarize_keylog, Args, Command};

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();

    let mut stdout = io::stdout().lock();
    match args.command {
        Command::Keylog { file, strict } => summarize_keylog(&file, strict, &mut stdout),
        Command::Decrypt(decrypt) => decrypt_records(&decrypt, &mut stdout),
        Command::Suites => list_suites(&mut stdout),
    }
}
