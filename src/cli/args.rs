//! Command-line argument definitions.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use tlsdecrypt_core::Direction;

use super::OutputFormat;

/// Decrypt captured SSL/TLS/DTLS records.
#[derive(Parser, Debug)]
#[command(name = "tlsdecrypt")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarize an NSS key log file
    Keylog {
        /// Key log file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Fail on the first malformed line
        #[arg(long)]
        strict: bool,
    },

    /// Decrypt records of one session
    Decrypt(DecryptArgs),

    /// List supported cipher suites
    Suites,
}

/// Session parameters and records for `decrypt`.
#[derive(ClapArgs, Debug)]
pub struct DecryptArgs {
    /// Key log file with the session's secrets
    #[arg(short = 'k', long, value_name = "FILE")]
    pub keylog: Option<PathBuf>,

    /// ClientHello random (64 hex digits)
    #[arg(long, value_parser = parse_random)]
    pub client_random: [u8; 32],

    /// ServerHello random (64 hex digits)
    #[arg(long, value_parser = parse_random)]
    pub server_random: [u8; 32],

    /// Negotiated cipher suite, e.g. 0xc02f
    #[arg(long, value_parser = parse_u16)]
    pub cipher_suite: u16,

    /// Negotiated protocol version, e.g. 0x0303
    #[arg(long, value_parser = parse_u16)]
    pub protocol_version: u16,

    /// Negotiated compression method (1 = DEFLATE)
    #[arg(long, default_value = "0")]
    pub compression: u8,

    /// Sender of the records
    #[arg(short = 'd', long, value_enum, default_value = "server")]
    pub direction: DirectionArg,

    /// Pre-master secret in hex
    #[arg(long, value_name = "HEX")]
    pub premaster: Option<String>,

    /// Pre-shared key in hex for PSK suites
    #[arg(long, value_name = "HEX")]
    pub psk: Option<String>,

    /// Both sides negotiated encrypt-then-MAC
    #[arg(long)]
    pub encrypt_then_mac: bool,

    /// TLS 1.3: records follow the sender's Finished message
    #[arg(long)]
    pub application: bool,

    /// Record as `TYPE:HEX` or, for DTLS, `TYPE:EPOCH:SEQ:HEX`
    #[arg(short = 'r', long = "record", required = true)]
    pub records: Vec<RecordArg>,

    /// Keep going when a MAC or tag does not verify
    #[arg(long)]
    pub ignore_auth_failures: bool,

    /// TLS 1.3 records from a pre-final draft (empty AAD, draft Key Update label)
    #[arg(long)]
    pub tls13_draft: bool,

    /// Leave DEFLATE-compressed records compressed
    #[arg(long)]
    pub no_decompress: bool,

    /// Print the session's CLIENT_RANDOM key log line
    #[arg(long)]
    pub export_keys: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "hex")]
    pub format: OutputFormat,
}

/// Record sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Client,
    Server,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Client => Direction::ClientToServer,
            DirectionArg::Server => Direction::ServerToClient,
        }
    }
}

/// One protected record from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordArg {
    pub content_type: u8,
    /// DTLS epoch and sequence number from the record header
    pub dtls: Option<(u16, u64)>,
    pub fragment: Vec<u8>,
}

impl FromStr for RecordArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (content_type, dtls, fragment) = match parts.as_slice() {
            [ct, data] => (ct, None, data),
            [ct, epoch, seq, data] => {
                let epoch = epoch.parse().map_err(|e| format!("invalid epoch: {e}"))?;
                let seq = seq.parse().map_err(|e| format!("invalid sequence number: {e}"))?;
                (ct, Some((epoch, seq)), data)
            }
            _ => return Err("expected TYPE:HEX or TYPE:EPOCH:SEQ:HEX".to_string()),
        };
        Ok(Self {
            content_type: content_type
                .parse()
                .map_err(|e| format!("invalid content type: {e}"))?,
            dtls,
            fragment: hex::decode(fragment).map_err(|e| format!("invalid hex: {e}"))?,
        })
    }
}

fn parse_random(s: &str) -> Result<[u8; 32], String> {
    let bytes = hex::decode(s).map_err(|e| format!("invalid hex: {e}"))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| format!("expected 32 bytes, got {}", b.len()))
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid value '{s}': {e}"))
}
