//! Key log parser.
//!
//! Reads the NSS key log format written by browsers, curl and most TLS
//! libraries when `SSLKEYLOGFILE` is set, plus the two `RSA` line forms used
//! to hand over pre-master and session-ID master secrets:
//!
//! ```text
//! RSA <16 hex: first 8 bytes of encrypted pre-master> <pre-master hex>
//! RSA Session-ID:<session id hex> Master-Key:<96 hex>
//! CLIENT_RANDOM <64 hex> <96 hex master secret>
//! PMS_CLIENT_RANDOM <64 hex> <pre-master hex>
//! CLIENT_HANDSHAKE_TRAFFIC_SECRET <64 hex> <secret hex>   (and the other TLS 1.3 labels)
//! ```
//!
//! Unknown labels are ignored. Malformed lines with a known label are skipped
//! and counted by the lenient loaders, or reported by [`KeyLog::parse_strict`].

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::secrets::{
    SecretCacheSet, SecretMaterial, TrafficSecretKind, ENCRYPTED_PREMASTER_PREFIX_LEN,
    MASTER_SECRET_LEN,
};

/// Errors that can occur when parsing a key log.
#[derive(Debug, Error)]
pub enum KeyLogError {
    /// I/O error reading the file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid hex string in key log
    #[error("Invalid hex at line {line}: {message}")]
    InvalidHex { line: usize, message: String },

    /// Invalid line format
    #[error("Invalid format at line {line}: {message}")]
    InvalidFormat { line: usize, message: String },
}

/// A single secret from a key log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLogEntry {
    /// `RSA <encrypted prefix> <pre-master>`
    RsaPremaster {
        encrypted_prefix: [u8; ENCRYPTED_PREMASTER_PREFIX_LEN],
        premaster: SecretMaterial,
    },

    /// `RSA Session-ID:<id> Master-Key:<master>`
    SessionMaster {
        session_id: Vec<u8>,
        master_secret: SecretMaterial,
    },

    /// `CLIENT_RANDOM <client_random> <master_secret>`
    ClientRandom {
        client_random: [u8; 32],
        master_secret: SecretMaterial,
    },

    /// `PMS_CLIENT_RANDOM <client_random> <pre-master>`
    PremasterClientRandom {
        client_random: [u8; 32],
        premaster: SecretMaterial,
    },

    /// Any of the TLS 1.3 secret labels.
    /// Secret length depends on the suite hash (32 for SHA-256, 48 for SHA-384).
    TrafficSecret {
        kind: TrafficSecretKind,
        client_random: [u8; 32],
        secret: SecretMaterial,
    },
}

impl KeyLogEntry {
    /// Get the client_random for entries keyed by one.
    pub fn client_random(&self) -> Option<&[u8; 32]> {
        match self {
            KeyLogEntry::ClientRandom { client_random, .. }
            | KeyLogEntry::PremasterClientRandom { client_random, .. }
            | KeyLogEntry::TrafficSecret { client_random, .. } => Some(client_random),
            KeyLogEntry::RsaPremaster { .. } | KeyLogEntry::SessionMaster { .. } => None,
        }
    }

    /// Store this entry in the matching cache.
    pub fn apply(&self, caches: &SecretCacheSet) {
        match self {
            KeyLogEntry::RsaPremaster {
                encrypted_prefix,
                premaster,
            } => caches.insert_encrypted_premaster(*encrypted_prefix, premaster.clone()),
            KeyLogEntry::SessionMaster {
                session_id,
                master_secret,
            } => caches.insert_session_master(session_id, master_secret.clone()),
            KeyLogEntry::ClientRandom {
                client_random,
                master_secret,
            } => caches.insert_client_random_master(*client_random, master_secret.clone()),
            KeyLogEntry::PremasterClientRandom {
                client_random,
                premaster,
            } => caches.insert_client_random_premaster(*client_random, premaster.clone()),
            KeyLogEntry::TrafficSecret {
                kind,
                client_random,
                secret,
            } => caches.insert_traffic_secret(*client_random, *kind, secret.clone()),
        }
    }
}

/// Parsed key log.
#[derive(Debug, Clone, Default)]
pub struct KeyLog {
    entries: Vec<KeyLogEntry>,

    /// Lines with a known label that failed to parse.
    skipped_lines: usize,

    /// Lines with an unknown label.
    ignored_lines: usize,
}

impl KeyLog {
    /// Create an empty KeyLog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a KeyLog from file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, KeyLogError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse a KeyLog from a string.
    pub fn parse(content: &str) -> Result<Self, KeyLogError> {
        Self::from_reader(content.as_bytes())
    }

    /// Parse a KeyLog from any reader, skipping malformed lines.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, KeyLogError> {
        Self::read(reader, false)
    }

    /// Parse a KeyLog, failing on the first malformed line.
    pub fn parse_strict(content: &str) -> Result<Self, KeyLogError> {
        Self::read(content.as_bytes(), true)
    }

    fn read<R: Read>(reader: R, strict: bool) -> Result<Self, KeyLogError> {
        let reader = BufReader::new(reader);
        let mut keylog = KeyLog::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line_num = line_num + 1; // 1-indexed for error messages

            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match parse_line(line, line_num) {
                Ok(Some(entry)) => keylog.entries.push(entry),
                Ok(None) => {
                    debug!(line = line_num, "ignoring unknown key log label");
                    keylog.ignored_lines += 1;
                }
                Err(e) if strict => return Err(e),
                Err(e) => {
                    warn!("skipping key log line: {e}");
                    keylog.skipped_lines += 1;
                }
            }
        }

        Ok(keylog)
    }

    /// Load every entry into `caches`.
    pub fn load_into(&self, caches: &SecretCacheSet) {
        for entry in &self.entries {
            entry.apply(caches);
        }
        debug!(
            entries = self.entries.len(),
            sessions = self.session_count(),
            "loaded key log"
        );
    }

    pub fn entries(&self) -> &[KeyLogEntry] {
        &self.entries
    }

    /// Get the number of unique client randoms in the keylog.
    pub fn session_count(&self) -> usize {
        self.entries
            .iter()
            .filter_map(KeyLogEntry::client_random)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Get the total number of entries parsed.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    pub fn ignored_lines(&self) -> usize {
        self.ignored_lines
    }

    /// Check if the keylog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a single key log line.
///
/// Returns `Ok(None)` for labels this parser does not know.
pub fn parse_line(line: &str, line_num: usize) -> Result<Option<KeyLogEntry>, KeyLogError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let label = parts.first().copied().unwrap_or_default();

    let known = label == "RSA"
        || label == "CLIENT_RANDOM"
        || label == "PMS_CLIENT_RANDOM"
        || TrafficSecretKind::from_label(label).is_some();
    if !known {
        return Ok(None);
    }

    if parts.len() != 3 {
        return Err(KeyLogError::InvalidFormat {
            line: line_num,
            message: format!("expected 3 space-separated fields, got {}", parts.len()),
        });
    }
    let (first, second) = (parts[1], parts[2]);

    let entry = match label {
        "RSA" => match first.strip_prefix("Session-ID:") {
            Some(session_id) => {
                let master_hex = second.strip_prefix("Master-Key:").ok_or_else(|| {
                    KeyLogError::InvalidFormat {
                        line: line_num,
                        message: "expected Master-Key: after Session-ID:".to_string(),
                    }
                })?;
                KeyLogEntry::SessionMaster {
                    session_id: parse_hex(session_id, line_num)?,
                    master_secret: parse_secret(master_hex, Some(MASTER_SECRET_LEN), line_num)?,
                }
            }
            None => KeyLogEntry::RsaPremaster {
                encrypted_prefix: parse_hex_array(first, line_num)?,
                premaster: parse_secret(second, None, line_num)?,
            },
        },
        "CLIENT_RANDOM" => KeyLogEntry::ClientRandom {
            client_random: parse_hex_array(first, line_num)?,
            master_secret: parse_secret(second, Some(MASTER_SECRET_LEN), line_num)?,
        },
        "PMS_CLIENT_RANDOM" => KeyLogEntry::PremasterClientRandom {
            client_random: parse_hex_array(first, line_num)?,
            premaster: parse_secret(second, None, line_num)?,
        },
        _ => match TrafficSecretKind::from_label(label) {
            Some(kind) => KeyLogEntry::TrafficSecret {
                kind,
                client_random: parse_hex_array(first, line_num)?,
                secret: parse_secret(second, None, line_num)?,
            },
            None => return Ok(None),
        },
    };

    Ok(Some(entry))
}

/// Parse a hex string into a fixed-size array.
fn parse_hex_array<const N: usize>(hex: &str, line: usize) -> Result<[u8; N], KeyLogError> {
    if hex.len() != N * 2 {
        return Err(KeyLogError::InvalidHex {
            line,
            message: format!("expected {} hex chars, got {}", N * 2, hex.len()),
        });
    }
    let mut arr = [0u8; N];
    hex::decode_to_slice(hex, &mut arr).map_err(|e| KeyLogError::InvalidHex {
        line,
        message: e.to_string(),
    })?;
    Ok(arr)
}

fn parse_secret(
    hex: &str,
    expected_len: Option<usize>,
    line: usize,
) -> Result<SecretMaterial, KeyLogError> {
    let bytes = parse_hex(hex, line)?;
    if bytes.is_empty() {
        return Err(KeyLogError::InvalidHex {
            line,
            message: "empty secret".to_string(),
        });
    }
    if let Some(expected) = expected_len {
        if bytes.len() != expected {
            return Err(KeyLogError::InvalidHex {
                line,
                message: format!("expected {} hex chars, got {}", expected * 2, hex.len()),
            });
        }
    }
    Ok(SecretMaterial::new(bytes))
}

fn parse_hex(hex: &str, line: usize) -> Result<Vec<u8>, KeyLogError> {
    hex::decode(hex).map_err(|e| KeyLogError::InvalidHex {
        line,
        message: e.to_string(),
    })
}
