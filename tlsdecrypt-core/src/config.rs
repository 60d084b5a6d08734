//! Decryption policy knobs.

use std::fmt;

/// Largest TLSPlaintext fragment (2^14) plus the 1024 bytes of expansion
/// a compressed record may carry.
pub const MAX_PLAINTEXT_LEN: usize = 16 * 1024 + 1024;

/// Which TLS 1.3 record protection rules to follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tls13Revision {
    /// RFC 8446: the record header is the AAD, Key Update uses "traffic upd".
    #[default]
    Final,
    /// Pre-final drafts: empty AAD, Key Update uses
    /// "application traffic secret".
    Draft,
}

impl Tls13Revision {
    /// HKDF-Expand-Label label of the Key Update ratchet.
    pub fn key_update_label(&self) -> &'static [u8] {
        match self {
            Tls13Revision::Final => b"traffic upd",
            Tls13Revision::Draft => b"application traffic secret",
        }
    }

    /// Whether the 5-byte record header is authenticated as AAD.
    pub fn header_is_aad(&self) -> bool {
        *self == Tls13Revision::Final
    }
}

/// Configuration shared by the record codec and sessions.
#[derive(Clone, PartialEq, Eq)]
pub struct DecryptConfig {
    /// Return best-effort plaintext when a MAC or AEAD tag does not verify.
    pub ignore_auth_failures: bool,
    /// Pre-shared key used for plain PSK key exchange.
    pub psk: Option<Vec<u8>>,
    /// Inflate records of sessions that negotiated DEFLATE.
    pub decompress: bool,
    /// Upper bound on a single decompressed record.
    pub max_decompressed_len: usize,
    /// TLS 1.3 AAD and Key Update label rules.
    pub tls13_revision: Tls13Revision,
}

impl Default for DecryptConfig {
    fn default() -> Self {
        Self {
            ignore_auth_failures: false,
            psk: None,
            decompress: true,
            max_decompressed_len: MAX_PLAINTEXT_LEN,
            tls13_revision: Tls13Revision::Final,
        }
    }
}

impl DecryptConfig {
    pub fn with_psk(mut self, psk: impl Into<Vec<u8>>) -> Self {
        self.psk = Some(psk.into());
        self
    }

    pub fn ignoring_auth_failures(mut self) -> Self {
        self.ignore_auth_failures = true;
        self
    }

    pub fn with_tls13_revision(mut self, revision: Tls13Revision) -> Self {
        self.tls13_revision = revision;
        self
    }
}

// Keep the PSK out of logs.
impl fmt::Debug for DecryptConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptConfig")
            .field("ignore_auth_failures", &self.ignore_auth_failures)
            .field("psk", &self.psk.as_ref().map(|_| "<redacted>"))
            .field("decompress", &self.decompress)
            .field("max_decompressed_len", &self.max_decompressed_len)
            .field("tls13_revision", &self.tls13_revision)
            .finish()
    }
}
