//! Error types for tlsdecrypt-core.
//!
//! This module provides structured error types for all decryption operations:
//!
//! - [`enum@Error`] - Main error enum that wraps all error types
//! - [`ConfigError`] - Unusable suite, version or key sizes
//! - [`DecryptError`] - Per-record failures
//! - [`PremasterError`] - Failures of the RSA pre-master collaborator
//!
//! All errors implement `std::error::Error` and can be converted to `anyhow::Error`.

use thiserror::Error;

use crate::keylog::KeyLogError;
use crate::version::ProtocolVersion;

/// Main error type for tlsdecrypt-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Suite/version/key configuration problem
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Record could not be decrypted
    #[error("Decryption error: {0}")]
    Decrypt(#[from] DecryptError),

    /// Key log could not be read
    #[error("Key log error: {0}")]
    KeyLog(#[from] KeyLogError),

    /// RSA pre-master recovery failed
    #[error("Pre-master error: {0}")]
    Premaster(#[from] PremasterError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The negotiated parameters cannot be used for decryption.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Suite id missing from the registry
    #[error("Unknown cipher suite: 0x{0:04x}")]
    UnknownCipherSuite(u16),

    /// Wire version not recognised
    #[error("Unsupported protocol version: 0x{0:04x}")]
    UnsupportedVersion(u16),

    /// Suite cannot be used with the negotiated version
    #[error("Cipher suite 0x{suite:04x} cannot be used with {version}")]
    VersionMismatch {
        suite: u16,
        version: ProtocolVersion,
    },

    /// Digest not usable for the requested derivation
    #[error("Unsupported digest for {0}")]
    UnsupportedDigest(&'static str),

    /// Key, IV or secret of the wrong size
    #[error("Invalid {what} length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Underlying primitive rejected the input
    #[error("Key derivation failed: {0}")]
    DerivationFailed(&'static str),
}

/// Failure while decrypting a single record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptError {
    /// Configuration problem, the record is skipped
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No secret could be found or computed for the session
    #[error("No key material available for this session")]
    KeyMaterialMissing,

    /// Record too short for the expected framing
    #[error("Truncated {what}: need {needed} bytes, have {have}")]
    TruncatedInput {
        what: &'static str,
        needed: usize,
        have: usize,
    },

    /// MAC, AEAD tag or padding check failed
    #[error("Authentication failure: {reason}")]
    AuthenticationFailure { reason: &'static str },

    /// Decompression of the verified plaintext failed
    #[error("Decompression failed: {0}")]
    Decompression(String),
}

impl DecryptError {
    /// Whether this error leaves the session usable for later records.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DecryptError::Decompression(_))
    }
}

/// Errors from recovering an RSA-encrypted pre-master secret.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PremasterError {
    /// The private-key operation itself failed
    #[error("RSA decryption failed: {0}")]
    Decrypt(String),

    /// PKCS#1 v1.5 block type 2 framing is wrong
    #[error("Invalid PKCS#1 padding: {0}")]
    InvalidPadding(&'static str),

    /// Recovered secret has the wrong size
    #[error("Pre-master secret must be 48 bytes, got {0}")]
    InvalidLength(usize),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
