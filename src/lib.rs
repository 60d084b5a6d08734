//! tlsdecrypt - decrypt captured SSL/TLS/DTLS records.
//!
//! The decryption engine lives in [`tlsdecrypt_core`]; this crate adds the
//! command-line front end.
//!
//! # Example
//!
//! ```no_run
//! use tlsdecrypt::cli::summarize_keylog;
//!
//! let mut out = Vec::new();
//! summarize_keylog("sslkeylog.txt".as_ref(), false, &mut out)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;

pub use tlsdecrypt_core as core;
