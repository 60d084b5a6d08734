//! Key-block expansion.
//!
//! Implements:
//! - Pre-TLS 1.3 key block derivation and slicing, including export-grade
//!   key stretching for SSLv3 and TLS 1.0
//! - TLS 1.3 traffic key/IV derivation and the Key Update ratchet

use std::fmt;

use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::Tls13Revision;
use crate::error::ConfigError;
use crate::prf::{self, HashAlgorithm};
use crate::secrets::{SecretMaterial, TrafficSecretKind};
use crate::suites::{CipherMode, CipherSuiteDescriptor};
use crate::version::{PrfFamily, ProtocolVersion};

/// Direction of TLS traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

impl Direction {
    pub fn is_client(&self) -> bool {
        matches!(self, Direction::ClientToServer)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToServer => write!(f, "client"),
            Direction::ServerToClient => write!(f, "server"),
        }
    }
}

/// Key material derived from a pre-TLS 1.3 master secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    /// Client write MAC key (empty for AEAD)
    pub client_mac: Vec<u8>,
    /// Server write MAC key (empty for AEAD)
    pub server_mac: Vec<u8>,
    /// Client write encryption key
    pub client_key: Vec<u8>,
    /// Server write encryption key
    pub server_key: Vec<u8>,
    /// Client write IV, implicit salt or static IV
    pub client_iv: Vec<u8>,
    /// Server write IV, implicit salt or static IV
    pub server_iv: Vec<u8>,
}

/// Borrowed keys for one direction.
#[derive(Clone, Copy)]
pub struct DirectionKeys<'a> {
    pub mac: &'a [u8],
    pub key: &'a [u8],
    pub iv: &'a [u8],
}

impl KeyMaterial {
    pub fn for_direction(&self, direction: Direction) -> DirectionKeys<'_> {
        match direction {
            Direction::ClientToServer => DirectionKeys {
                mac: &self.client_mac,
                key: &self.client_key,
                iv: &self.client_iv,
            },
            Direction::ServerToClient => DirectionKeys {
                mac: &self.server_mac,
                key: &self.server_key,
                iv: &self.server_iv,
            },
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("mac_len", &self.client_mac.len())
            .field("key_len", &self.client_key.len())
            .field("iv_len", &self.client_iv.len())
            .finish()
    }
}

/// TLS 1.3 key material derived from a traffic secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Tls13KeyMaterial {
    /// Encryption key
    pub key: Vec<u8>,
    /// IV for nonce construction
    pub iv: Vec<u8>,
}

impl fmt::Debug for Tls13KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tls13KeyMaterial")
            .field("key_len", &self.key.len())
            .field("iv_len", &self.iv.len())
            .finish()
    }
}

/// Key epochs of a TLS 1.3 connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficPhase {
    Early,
    Handshake,
    Application,
}

impl TrafficPhase {
    /// Key-log secret protecting this phase in `direction`.
    ///
    /// Early data only flows from the client.
    pub fn secret_kind(&self, direction: Direction) -> Option<TrafficSecretKind> {
        match (self, direction) {
            (TrafficPhase::Early, Direction::ClientToServer) => Some(TrafficSecretKind::ClientEarly),
            (TrafficPhase::Early, Direction::ServerToClient) => None,
            (TrafficPhase::Handshake, Direction::ClientToServer) => {
                Some(TrafficSecretKind::ClientHandshake)
            }
            (TrafficPhase::Handshake, Direction::ServerToClient) => {
                Some(TrafficSecretKind::ServerHandshake)
            }
            (TrafficPhase::Application, Direction::ClientToServer) => {
                Some(TrafficSecretKind::ClientApplication)
            }
            (TrafficPhase::Application, Direction::ServerToClient) => {
                Some(TrafficSecretKind::ServerApplication)
            }
        }
    }
}

// ============================================================================
// Pre-TLS 1.3
// ============================================================================

/// Expand the master secret into the six session keys.
///
/// key_block = PRF(master, "key expansion", server_random + client_random)
///
/// sliced as client MAC, server MAC, client key, server key, client IV,
/// server IV. Export suites take a short key from the block and stretch it
/// to the cipher's native size.
pub fn derive_key_material(
    version: ProtocolVersion,
    suite: &CipherSuiteDescriptor,
    master: &SecretMaterial,
    client_random: &[u8; 32],
    server_random: &[u8; 32],
) -> Result<KeyMaterial, ConfigError> {
    if version.is_tls13() {
        return Err(ConfigError::VersionMismatch {
            suite: suite.id,
            version,
        });
    }

    let mac_len = suite.mac_len();
    let key_len = suite.export_key_len().unwrap_or_else(|| suite.key_len());
    let iv_len = suite.iv_len();
    let needed = 2 * mac_len + 2 * key_len + 2 * iv_len;

    let key_block = prf::prf(
        version,
        suite.digest,
        master.as_bytes(),
        b"key expansion",
        server_random,
        Some(client_random),
        needed,
    )?;
    if key_block.len() != needed {
        return Err(ConfigError::InvalidKeyLength {
            what: "key block",
            expected: needed,
            actual: key_block.len(),
        });
    }

    let mut parts = KeyBlockReader::new(&key_block);
    let mut keys = KeyMaterial {
        client_mac: parts.take(mac_len),
        server_mac: parts.take(mac_len),
        client_key: parts.take(key_len),
        server_key: parts.take(key_len),
        client_iv: parts.take(iv_len),
        server_iv: parts.take(iv_len),
    };

    if suite.is_export() {
        stretch_export_keys(version, suite, &mut keys, client_random, server_random)?;
    }

    debug!(
        suite = suite.name,
        %version,
        mac_len,
        key_len = keys.client_key.len(),
        iv_len,
        "derived key block"
    );
    Ok(keys)
}

struct KeyBlockReader<'a> {
    block: &'a [u8],
    offset: usize,
}

impl<'a> KeyBlockReader<'a> {
    fn new(block: &'a [u8]) -> Self {
        Self { block, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Vec<u8> {
        let part = self.block[self.offset..self.offset + len].to_vec();
        self.offset += len;
        part
    }
}

fn stretch_export_keys(
    version: ProtocolVersion,
    suite: &CipherSuiteDescriptor,
    keys: &mut KeyMaterial,
    client_random: &[u8; 32],
    server_random: &[u8; 32],
) -> Result<(), ConfigError> {
    let native_len = suite.key_len();
    let block_len = if suite.mode == CipherMode::Cbc {
        suite.iv_len()
    } else {
        0
    };

    match version.prf_family() {
        PrfFamily::Ssl3 => {
            let md5 = HashAlgorithm::Md5;
            keys.client_key = md5.digest(&[&keys.client_key, client_random, server_random]);
            keys.server_key = md5.digest(&[&keys.server_key, server_random, client_random]);
            keys.client_key.truncate(native_len);
            keys.server_key.truncate(native_len);

            if block_len > 0 {
                keys.client_iv = md5.digest(&[client_random, server_random]);
                keys.server_iv = md5.digest(&[server_random, client_random]);
                keys.client_iv.truncate(block_len);
                keys.server_iv.truncate(block_len);
            }
        }
        _ => {
            let seed = [client_random.as_slice(), server_random.as_slice()].concat();
            keys.client_key = prf::prf(
                version,
                suite.digest,
                &keys.client_key,
                b"client write key",
                &seed,
                None,
                native_len,
            )?;
            keys.server_key = prf::prf(
                version,
                suite.digest,
                &keys.server_key,
                b"server write key",
                &seed,
                None,
                native_len,
            )?;

            if block_len > 0 {
                let iv_block =
                    prf::prf(version, suite.digest, b"", b"IV block", &seed, None, 2 * block_len)?;
                keys.client_iv = iv_block[..block_len].to_vec();
                keys.server_iv = iv_block[block_len..].to_vec();
            }
        }
    }

    Ok(())
}

// ============================================================================
// TLS 1.3
// ============================================================================

/// Derive the record key and IV from a TLS 1.3 traffic secret.
///
/// key = HKDF-Expand-Label(secret, "key", "", key_length)
/// iv  = HKDF-Expand-Label(secret, "iv", "", 12)
pub fn derive_tls13_keys(
    secret: &SecretMaterial,
    suite: &CipherSuiteDescriptor,
) -> Result<Tls13KeyMaterial, ConfigError> {
    check_tls13_secret(secret, suite)?;
    let key = prf::hkdf_expand_label(secret.as_bytes(), b"key", b"", suite.key_len(), suite.digest)?;
    let iv = prf::hkdf_expand_label(secret.as_bytes(), b"iv", b"", 12, suite.digest)?;
    Ok(Tls13KeyMaterial { key, iv })
}

/// Key Update ratchet (RFC 8446 section 7.2).
///
/// next = HKDF-Expand-Label(current, label, "", Hash.length), where the label
/// is "traffic upd" for the final protocol and "application traffic secret"
/// for drafts.
pub fn next_traffic_secret(
    secret: &SecretMaterial,
    suite: &CipherSuiteDescriptor,
    revision: Tls13Revision,
) -> Result<SecretMaterial, ConfigError> {
    check_tls13_secret(secret, suite)?;
    let hash_len = suite.digest.output_len();
    let label = revision.key_update_label();
    let next = prf::hkdf_expand_label(secret.as_bytes(), label, b"", hash_len, suite.digest)?;
    Ok(SecretMaterial::new(next))
}

fn check_tls13_secret(
    secret: &SecretMaterial,
    suite: &CipherSuiteDescriptor,
) -> Result<(), ConfigError> {
    if !suite.is_tls13() {
        return Err(ConfigError::VersionMismatch {
            suite: suite.id,
            version: ProtocolVersion::Tls13,
        });
    }
    let expected = suite.digest.output_len();
    if secret.len() != expected {
        return Err(ConfigError::InvalidKeyLength {
            what: "traffic secret",
            expected,
            actual: secret.len(),
        });
    }
    Ok(())
}
