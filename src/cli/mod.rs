//! Command-line interface module.
//!
//! This module handles:
//! - Argument parsing via clap
//! - Key log summaries and the suite listing
//! - Record decryption and output formatting (hex dump, text)

mod args;
mod commands;
mod output;

pub use args::{Args, Command, DecryptArgs, DirectionArg, RecordArg};
pub use commands::{decrypt_records, list_suites, summarize_keylog};
pub use output::{OutputFormat, OutputFormatter};
