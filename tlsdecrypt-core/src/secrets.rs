//! Secret storage and master-secret resolution.
//!
//! [`SecretCacheSet`] holds every secret learned from key logs, RSA
//! decryption or earlier sessions. [`SecretResolver`] walks those sources in
//! a fixed order to produce the master secret of a pre-TLS 1.3 session.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ConfigError, DecryptError, PremasterError};
use crate::prf;
use crate::suites::CipherSuiteDescriptor;
use crate::version::{PrfFamily, ProtocolVersion};

/// Length of every pre-TLS 1.3 master secret.
pub const MASTER_SECRET_LEN: usize = 48;

/// Bytes of the encrypted pre-master used as its cache key.
pub const ENCRYPTED_PREMASTER_PREFIX_LEN: usize = 8;

/// Owned secret bytes, wiped when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretMaterial {
    bytes: Vec<u8>,
}

impl SecretMaterial {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl PartialEq for SecretMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for SecretMaterial {}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretMaterial({} bytes)", self.bytes.len())
    }
}

/// TLS 1.3 secrets exported through the key log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficSecretKind {
    ClientEarly,
    ClientHandshake,
    ServerHandshake,
    ClientApplication,
    ServerApplication,
    Exporter,
    EarlyExporter,
}

impl TrafficSecretKind {
    /// Key-log label of this secret.
    pub fn label(&self) -> &'static str {
        match self {
            TrafficSecretKind::ClientEarly => "CLIENT_EARLY_TRAFFIC_SECRET",
            TrafficSecretKind::ClientHandshake => "CLIENT_HANDSHAKE_TRAFFIC_SECRET",
            TrafficSecretKind::ServerHandshake => "SERVER_HANDSHAKE_TRAFFIC_SECRET",
            TrafficSecretKind::ClientApplication => "CLIENT_TRAFFIC_SECRET_0",
            TrafficSecretKind::ServerApplication => "SERVER_TRAFFIC_SECRET_0",
            TrafficSecretKind::Exporter => "EXPORTER_SECRET",
            TrafficSecretKind::EarlyExporter => "EARLY_EXPORTER_SECRET",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "CLIENT_EARLY_TRAFFIC_SECRET" => Some(TrafficSecretKind::ClientEarly),
            "CLIENT_HANDSHAKE_TRAFFIC_SECRET" => Some(TrafficSecretKind::ClientHandshake),
            "SERVER_HANDSHAKE_TRAFFIC_SECRET" => Some(TrafficSecretKind::ServerHandshake),
            "CLIENT_TRAFFIC_SECRET_0" => Some(TrafficSecretKind::ClientApplication),
            "SERVER_TRAFFIC_SECRET_0" => Some(TrafficSecretKind::ServerApplication),
            "EXPORTER_SECRET" => Some(TrafficSecretKind::Exporter),
            "EARLY_EXPORTER_SECRET" => Some(TrafficSecretKind::EarlyExporter),
            _ => None,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub master_secrets: usize,
    pub premaster_secrets: usize,
    pub traffic_secrets: usize,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// All secrets known to the decryptor, shared between sessions.
///
/// Each map clones secrets in and out; nothing is aliased.
#[derive(Default)]
pub struct SecretCacheSet {
    master_by_client_random: RwLock<HashMap<[u8; 32], SecretMaterial>>,
    master_by_session_id: RwLock<HashMap<Vec<u8>, SecretMaterial>>,
    master_by_ticket: RwLock<HashMap<Vec<u8>, SecretMaterial>>,
    premaster_by_encrypted: RwLock<HashMap<[u8; ENCRYPTED_PREMASTER_PREFIX_LEN], SecretMaterial>>,
    premaster_by_client_random: RwLock<HashMap<[u8; 32], SecretMaterial>>,
    traffic_secrets: RwLock<HashMap<([u8; 32], TrafficSecretKind), SecretMaterial>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SecretCacheSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_client_random_master(&self, client_random: [u8; 32], master: SecretMaterial) {
        self.master_by_client_random
            .write()
            .insert(client_random, master);
    }

    pub fn insert_session_master(&self, session_id: &[u8], master: SecretMaterial) {
        if !session_id.is_empty() {
            self.master_by_session_id
                .write()
                .insert(session_id.to_vec(), master);
        }
    }

    pub fn insert_ticket_master(&self, ticket: &[u8], master: SecretMaterial) {
        if !ticket.is_empty() {
            self.master_by_ticket.write().insert(ticket.to_vec(), master);
        }
    }

    /// Cache a pre-master under the first 8 bytes of its RSA encryption.
    pub fn insert_encrypted_premaster(
        &self,
        prefix: [u8; ENCRYPTED_PREMASTER_PREFIX_LEN],
        premaster: SecretMaterial,
    ) {
        self.premaster_by_encrypted.write().insert(prefix, premaster);
    }

    pub fn insert_client_random_premaster(&self, client_random: [u8; 32], premaster: SecretMaterial) {
        self.premaster_by_client_random
            .write()
            .insert(client_random, premaster);
    }

    pub fn insert_traffic_secret(
        &self,
        client_random: [u8; 32],
        kind: TrafficSecretKind,
        secret: SecretMaterial,
    ) {
        self.traffic_secrets
            .write()
            .insert((client_random, kind), secret);
    }

    pub fn master_by_client_random(&self, client_random: &[u8; 32]) -> Option<SecretMaterial> {
        self.get(&self.master_by_client_random, client_random)
    }

    pub fn master_by_session_id(&self, session_id: &[u8]) -> Option<SecretMaterial> {
        if session_id.is_empty() {
            return None;
        }
        self.get(&self.master_by_session_id, session_id)
    }

    pub fn master_by_ticket(&self, ticket: &[u8]) -> Option<SecretMaterial> {
        if ticket.is_empty() {
            return None;
        }
        self.get(&self.master_by_ticket, ticket)
    }

    /// Look up a pre-master by its encrypted form (only the prefix is used).
    pub fn premaster_by_encrypted(&self, encrypted: &[u8]) -> Option<SecretMaterial> {
        let prefix = encrypted_prefix(encrypted)?;
        self.get(&self.premaster_by_encrypted, &prefix)
    }

    pub fn premaster_by_client_random(&self, client_random: &[u8; 32]) -> Option<SecretMaterial> {
        self.get(&self.premaster_by_client_random, client_random)
    }

    pub fn traffic_secret(
        &self,
        client_random: &[u8; 32],
        kind: TrafficSecretKind,
    ) -> Option<SecretMaterial> {
        self.get(&self.traffic_secrets, &(*client_random, kind))
    }

    /// Snapshot of every (client random, master secret) pair.
    pub fn client_random_masters(&self) -> Vec<([u8; 32], SecretMaterial)> {
        let mut pairs: Vec<_> = self
            .master_by_client_random
            .read()
            .iter()
            .map(|(random, master)| (*random, master.clone()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            master_secrets: self.master_by_client_random.read().len()
                + self.master_by_session_id.read().len()
                + self.master_by_ticket.read().len(),
            premaster_secrets: self.premaster_by_encrypted.read().len()
                + self.premaster_by_client_random.read().len(),
            traffic_secrets: self.traffic_secrets.read().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        let stats = self.stats();
        stats.master_secrets + stats.premaster_secrets + stats.traffic_secrets == 0
    }

    fn get<K, Q>(&self, map: &RwLock<HashMap<K, SecretMaterial>>, key: &Q) -> Option<SecretMaterial>
    where
        K: Borrow<Q> + Hash + Eq,
        Q: Hash + Eq + ?Sized,
    {
        let found = map.read().get(key).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }
}

impl fmt::Debug for SecretCacheSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCacheSet")
            .field("stats", &self.stats())
            .finish()
    }
}

fn encrypted_prefix(encrypted: &[u8]) -> Option<[u8; ENCRYPTED_PREMASTER_PREFIX_LEN]> {
    encrypted
        .get(..ENCRYPTED_PREMASTER_PREFIX_LEN)
        .and_then(|prefix| prefix.try_into().ok())
}

// ============================================================================
// Pre-master construction
// ============================================================================

/// Private-key operation supplied by the embedding application.
pub trait PremasterDecryptor: Send + Sync {
    /// Decrypt an RSA-encrypted pre-master secret.
    ///
    /// Returns the PKCS#1 v1.5 padded block; a bare 48-byte secret is also
    /// accepted.
    fn rsa_decrypt(&self, encrypted: &[u8]) -> Result<Vec<u8>, PremasterError>;
}

/// Validate PKCS#1 v1.5 type 2 padding and return the 48-byte pre-master.
pub fn strip_pkcs1_padding(block: &[u8]) -> Result<SecretMaterial, PremasterError> {
    if block.len() == MASTER_SECRET_LEN {
        return Ok(SecretMaterial::from_slice(block));
    }

    // Some RSA back ends drop the leading zero byte
    let block = block.strip_prefix(&[0x00]).unwrap_or(block);
    let body = match block.split_first() {
        Some((0x02, body)) => body,
        _ => return Err(PremasterError::InvalidPadding("block type is not 2")),
    };

    let separator = body
        .iter()
        .position(|&b| b == 0)
        .ok_or(PremasterError::InvalidPadding("missing zero separator"))?;
    if separator < 8 {
        return Err(PremasterError::InvalidPadding("fewer than 8 padding bytes"));
    }

    let premaster = &body[separator + 1..];
    if premaster.len() != MASTER_SECRET_LEN {
        return Err(PremasterError::InvalidLength(premaster.len()));
    }
    Ok(SecretMaterial::from_slice(premaster))
}

/// Plain PSK pre-master secret (RFC 4279 section 2).
///
/// `uint16(N) || N zero bytes || uint16(N) || psk`
///
/// Fails when the key does not fit the 16-bit length prefix.
pub fn psk_premaster(psk: &[u8]) -> Result<SecretMaterial, ConfigError> {
    let len = u16::try_from(psk.len())
        .map_err(|_| ConfigError::InvalidKeyLength {
            what: "PSK",
            expected: usize::from(u16::MAX),
            actual: psk.len(),
        })?
        .to_be_bytes();
    let mut bytes = Vec::with_capacity(4 + 2 * psk.len());
    bytes.extend_from_slice(&len);
    bytes.resize(2 + psk.len(), 0);
    bytes.extend_from_slice(&len);
    bytes.extend_from_slice(psk);
    Ok(SecretMaterial::new(bytes))
}

/// Promote a pre-master secret to the 48-byte master secret.
///
/// With `session_hash` set (RFC 7627) the label is "extended master secret"
/// and the seed is the hash; otherwise the seed is the two randoms.
pub fn derive_master_secret(
    version: ProtocolVersion,
    suite: &CipherSuiteDescriptor,
    premaster: &SecretMaterial,
    client_random: &[u8; 32],
    server_random: &[u8; 32],
    session_hash: Option<&[u8]>,
) -> Result<SecretMaterial, ConfigError> {
    let bytes = match (version.prf_family(), session_hash) {
        (PrfFamily::Tls13, _) => {
            return Err(ConfigError::DerivationFailed("TLS 1.3 has no master secret"))
        }
        (PrfFamily::Tls10 | PrfFamily::Tls12, Some(hash)) => prf::prf(
            version,
            suite.digest,
            premaster.as_bytes(),
            b"extended master secret",
            hash,
            None,
            MASTER_SECRET_LEN,
        )?,
        _ => prf::prf(
            version,
            suite.digest,
            premaster.as_bytes(),
            b"master secret",
            client_random,
            Some(server_random),
            MASTER_SECRET_LEN,
        )?,
    };
    Ok(SecretMaterial::new(bytes))
}

// ============================================================================
// Resolution
// ============================================================================

/// Where a master secret came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    /// Pre-master set directly on the session
    SessionPremaster,
    /// `PMS_CLIENT_RANDOM` key-log entry
    PremasterByClientRandom,
    /// `RSA <encrypted prefix>` key-log entry or earlier RSA decryption
    PremasterByEncrypted,
    /// Resumed session ticket
    Ticket,
    /// Resumed session ID
    SessionId,
    /// `CLIENT_RANDOM` key-log entry
    ClientRandom,
    /// Configured pre-shared key
    Psk,
    /// Private-key decryption of ClientKeyExchange
    RsaDecrypt,
}

/// What is known about a session when its master secret is needed.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    pub version: ProtocolVersion,
    pub suite: &'static CipherSuiteDescriptor,
    pub client_random: &'a [u8; 32],
    pub server_random: &'a [u8; 32],
    pub session_id: &'a [u8],
    pub session_ticket: &'a [u8],
    /// ServerHello echoed the client's session ID
    pub resumed: bool,
    pub premaster: Option<&'a SecretMaterial>,
    pub encrypted_premaster: Option<&'a [u8]>,
    /// Present when both hellos negotiated the extended master secret
    pub session_hash: Option<&'a [u8]>,
}

/// A master secret together with its source.
#[derive(Debug, Clone)]
pub struct ResolvedMaster {
    pub secret: SecretMaterial,
    pub source: SecretSource,
}

/// Locates or computes master secrets.
pub struct SecretResolver<'a> {
    caches: &'a SecretCacheSet,
    psk: Option<&'a [u8]>,
    decryptor: Option<&'a dyn PremasterDecryptor>,
}

impl<'a> SecretResolver<'a> {
    pub fn new(caches: &'a SecretCacheSet) -> Self {
        Self {
            caches,
            psk: None,
            decryptor: None,
        }
    }

    pub fn with_psk(mut self, psk: Option<&'a [u8]>) -> Self {
        self.psk = psk;
        self
    }

    pub fn with_decryptor(mut self, decryptor: Option<&'a dyn PremasterDecryptor>) -> Self {
        self.decryptor = decryptor;
        self
    }

    /// Find the master secret for a session.
    ///
    /// Order: explicit pre-master (session, `PMS_CLIENT_RANDOM`, encrypted
    /// prefix), cached master (ticket when resuming, session ID, client
    /// random), PSK, RSA decryption.
    pub fn resolve(&self, req: &ResolveRequest<'_>) -> Result<ResolvedMaster, DecryptError> {
        if let Some((premaster, source)) = self.explicit_premaster(req) {
            return self.promote(req, &premaster, source);
        }

        if let Some(resolved) = self.cached_master(req) {
            debug!(source = ?resolved.source, "reusing cached master secret");
            return Ok(resolved);
        }

        if req.suite.kex.is_psk() {
            if let Some(psk) = self.psk {
                return self.promote(req, &psk_premaster(psk)?, SecretSource::Psk);
            }
        }

        if req.suite.kex.is_rsa() {
            if let (Some(decryptor), Some(encrypted)) = (self.decryptor, req.encrypted_premaster) {
                match decryptor
                    .rsa_decrypt(encrypted)
                    .and_then(|block| strip_pkcs1_padding(&block))
                {
                    Ok(premaster) => {
                        if let Some(prefix) = encrypted_prefix(encrypted) {
                            self.caches
                                .insert_encrypted_premaster(prefix, premaster.clone());
                        }
                        return self.promote(req, &premaster, SecretSource::RsaDecrypt);
                    }
                    Err(e) => warn!("RSA pre-master recovery failed: {e}"),
                }
            }
        }

        Err(DecryptError::KeyMaterialMissing)
    }

    /// Record a master secret for resumption and export.
    pub fn remember(
        &self,
        client_random: &[u8; 32],
        session_id: &[u8],
        session_ticket: &[u8],
        master: &SecretMaterial,
    ) {
        self.caches.insert_session_master(session_id, master.clone());
        self.caches.insert_ticket_master(session_ticket, master.clone());
        self.caches
            .insert_client_random_master(*client_random, master.clone());
    }

    fn explicit_premaster(
        &self,
        req: &ResolveRequest<'_>,
    ) -> Option<(SecretMaterial, SecretSource)> {
        if let Some(premaster) = req.premaster {
            return Some((premaster.clone(), SecretSource::SessionPremaster));
        }
        if let Some(premaster) = self.caches.premaster_by_client_random(req.client_random) {
            return Some((premaster, SecretSource::PremasterByClientRandom));
        }
        req.encrypted_premaster
            .and_then(|encrypted| self.caches.premaster_by_encrypted(encrypted))
            .map(|premaster| (premaster, SecretSource::PremasterByEncrypted))
    }

    fn cached_master(&self, req: &ResolveRequest<'_>) -> Option<ResolvedMaster> {
        let found = |secret: Option<SecretMaterial>, source| {
            secret.map(|secret| ResolvedMaster { secret, source })
        };

        if req.resumed {
            if let Some(resolved) =
                found(self.caches.master_by_ticket(req.session_ticket), SecretSource::Ticket)
            {
                return Some(resolved);
            }
        }
        found(
            self.caches.master_by_session_id(req.session_id),
            SecretSource::SessionId,
        )
        .or_else(|| {
            found(
                self.caches.master_by_client_random(req.client_random),
                SecretSource::ClientRandom,
            )
        })
    }

    fn promote(
        &self,
        req: &ResolveRequest<'_>,
        premaster: &SecretMaterial,
        source: SecretSource,
    ) -> Result<ResolvedMaster, DecryptError> {
        let secret = derive_master_secret(
            req.version,
            req.suite,
            premaster,
            req.client_random,
            req.server_random,
            req.session_hash,
        )?;
        debug!(
            ?source,
            extended = req.session_hash.is_some(),
            "derived master secret from pre-master"
        );
        Ok(ResolvedMaster { secret, source })
    }
}
