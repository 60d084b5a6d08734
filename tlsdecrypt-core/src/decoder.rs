//! Per-direction record protection state.
//!
//! A [`Decoder`] holds the bulk cipher, MAC key, IV and sequence number of
//! one direction of one epoch. It is replaced wholesale when keys change.

use std::fmt;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, KeyInit, KeyIvInit, StreamCipher, StreamCipherSeek};
use aes::{Aes128, Aes256};
use ccm::aead::AeadInPlace;
use ccm::consts::{U12, U16, U8};
use ccm::Ccm;
use des::{Des, TdesEde3};
use rc4::Rc4;
use ring::aead::{
    Aad, LessSafeKey, Nonce, UnboundKey, AES_128_GCM, AES_256_GCM, CHACHA20_POLY1305,
};
use tracing::debug;

use crate::compress::Decompressor;
use crate::config::Tls13Revision;
use crate::error::ConfigError;
use crate::kdf::{self, Direction, KeyMaterial, TrafficPhase};
use crate::secrets::SecretMaterial;
use crate::suites::{BulkCipher, CipherMode, CipherSuiteDescriptor};
use crate::version::ProtocolVersion;

/// Record decryption state for one direction.
pub struct Decoder {
    suite: &'static CipherSuiteDescriptor,
    version: ProtocolVersion,
    cipher: CipherState,
    write_key: SecretMaterial,
    /// CBC: IV of the next record (chained) or unused (explicit);
    /// GCM/CCM: 4-byte salt; ChaCha20 and TLS 1.3: 12-byte static IV.
    write_iv: Vec<u8>,
    mac_key: Option<SecretMaterial>,
    seq: u64,
    epoch: u16,
    compression: Option<Decompressor>,
    phase: Option<TrafficPhase>,
    app_traffic_secret: Option<SecretMaterial>,
    encrypt_then_mac: bool,
}

impl Decoder {
    /// Create a pre-TLS 1.3 decoder from raw keys.
    ///
    /// `mac_key` is ignored for AEAD suites. `deflate` enables the
    /// per-direction decompression state.
    pub fn new(
        version: ProtocolVersion,
        suite: &'static CipherSuiteDescriptor,
        key: &[u8],
        iv: &[u8],
        mac_key: &[u8],
        deflate: bool,
    ) -> Result<Self, ConfigError> {
        suite.check_version(version)?;

        let expected_iv = suite.iv_len();
        if iv.len() != expected_iv {
            return Err(ConfigError::InvalidKeyLength {
                what: "write IV",
                expected: expected_iv,
                actual: iv.len(),
            });
        }

        let mac_key = if suite.mode.is_aead() {
            None
        } else {
            let expected = suite.mac_len();
            if mac_key.len() != expected {
                return Err(ConfigError::InvalidKeyLength {
                    what: "MAC key",
                    expected,
                    actual: mac_key.len(),
                });
            }
            Some(SecretMaterial::from_slice(mac_key))
        };

        Ok(Self {
            suite,
            version,
            cipher: CipherState::new(suite, key)?,
            write_key: SecretMaterial::from_slice(key),
            write_iv: iv.to_vec(),
            mac_key,
            seq: 0,
            epoch: 0,
            compression: deflate.then(Decompressor::new),
            phase: None,
            app_traffic_secret: None,
            encrypt_then_mac: false,
        })
    }

    /// Create the decoder for `direction` from a derived key block.
    pub fn from_key_material(
        version: ProtocolVersion,
        suite: &'static CipherSuiteDescriptor,
        keys: &KeyMaterial,
        direction: Direction,
        deflate: bool,
    ) -> Result<Self, ConfigError> {
        let keys = keys.for_direction(direction);
        Self::new(version, suite, keys.key, keys.iv, keys.mac, deflate)
    }

    /// Create a TLS 1.3 decoder from a traffic secret.
    ///
    /// Application-phase decoders keep the secret for Key Update.
    pub fn tls13(
        suite: &'static CipherSuiteDescriptor,
        secret: &SecretMaterial,
        phase: TrafficPhase,
    ) -> Result<Self, ConfigError> {
        suite.check_version(ProtocolVersion::Tls13)?;
        let keys = kdf::derive_tls13_keys(secret, suite)?;

        Ok(Self {
            suite,
            version: ProtocolVersion::Tls13,
            cipher: CipherState::new(suite, &keys.key)?,
            write_key: SecretMaterial::from_slice(&keys.key),
            write_iv: keys.iv.clone(),
            mac_key: None,
            seq: 0,
            epoch: 0,
            compression: None,
            phase: Some(phase),
            app_traffic_secret: (phase == TrafficPhase::Application).then(|| secret.clone()),
            encrypt_then_mac: false,
        })
    }

    /// Build the decoder for the next application traffic secret.
    ///
    /// The new decoder starts at sequence number zero.
    pub fn key_update(&self, revision: Tls13Revision) -> Result<Decoder, ConfigError> {
        let secret = self
            .app_traffic_secret
            .as_ref()
            .ok_or(ConfigError::DerivationFailed("key update outside application phase"))?;
        let next = kdf::next_traffic_secret(secret, self.suite, revision)?;
        debug!(suite = self.suite.name, "applied key update");
        Decoder::tls13(self.suite, &next, TrafficPhase::Application)
    }

    pub fn suite(&self) -> &'static CipherSuiteDescriptor {
        self.suite
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Sequence number of the next record.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Set the sequence number (useful for resuming mid-stream).
    pub fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    pub fn epoch(&self) -> u16 {
        self.epoch
    }

    pub fn set_epoch(&mut self, epoch: u16) {
        self.epoch = epoch;
    }

    pub fn phase(&self) -> Option<TrafficPhase> {
        self.phase
    }

    pub fn encrypt_then_mac(&self) -> bool {
        self.encrypt_then_mac
    }

    /// Enable RFC 7366 for CBC suites.
    pub fn set_encrypt_then_mac(&mut self, enabled: bool) {
        self.encrypt_then_mac = enabled && self.suite.mode == CipherMode::Cbc;
    }

    pub fn has_compression(&self) -> bool {
        self.compression.is_some()
    }

    pub fn application_secret(&self) -> Option<&SecretMaterial> {
        self.app_traffic_secret.as_ref()
    }

    // ------------------------------------------------------------------------
    // Record-layer plumbing
    // ------------------------------------------------------------------------

    /// Return the current sequence number and advance it.
    pub(crate) fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        seq
    }

    pub(crate) fn mac_key(&self) -> &[u8] {
        self.mac_key.as_ref().map(SecretMaterial::as_bytes).unwrap_or_default()
    }

    pub(crate) fn write_iv(&self) -> &[u8] {
        &self.write_iv
    }

    pub(crate) fn set_chained_iv(&mut self, iv: &[u8]) {
        self.write_iv.clear();
        self.write_iv.extend_from_slice(iv);
    }

    pub(crate) fn decompressor(&mut self) -> Option<&mut Decompressor> {
        self.compression.as_mut()
    }

    pub(crate) fn apply_stream(&mut self, data: &mut [u8]) {
        if let CipherState::Rc4(rc4) = &mut self.cipher {
            rc4.apply_keystream(data);
        }
    }

    /// CBC-decrypt `data` in place using `iv` as the chaining value.
    pub(crate) fn decrypt_cbc(&self, iv: &[u8], data: &mut [u8]) -> Result<(), ConfigError> {
        let CipherState::Cbc(block) = &self.cipher else {
            return Err(ConfigError::DerivationFailed("not a CBC cipher"));
        };
        let block_len = block.block_len();
        if iv.len() != block_len || data.len() % block_len != 0 {
            return Err(ConfigError::InvalidKeyLength {
                what: "CBC block",
                expected: block_len,
                actual: iv.len(),
            });
        }

        let mut prev = iv.to_vec();
        for chunk in data.chunks_exact_mut(block_len) {
            let saved = chunk.to_vec();
            block.decrypt_block(chunk);
            for (b, p) in chunk.iter_mut().zip(prev.iter()) {
                *b ^= p;
            }
            prev = saved;
        }
        Ok(())
    }

    /// Authenticate and decrypt `in_out` (ciphertext followed by the tag).
    ///
    /// Returns the plaintext length, or `None` when the tag does not verify.
    pub(crate) fn open_aead(
        &self,
        nonce: [u8; 12],
        aad: &[u8],
        in_out: &mut [u8],
    ) -> Result<Option<usize>, ConfigError> {
        let CipherState::Aead(key) = &self.cipher else {
            return Err(ConfigError::DerivationFailed("not an AEAD cipher"));
        };
        let tag_len = self.suite.mode.tag_len();
        let Some(body_len) = in_out.len().checked_sub(tag_len) else {
            return Ok(None);
        };

        let opened = match key {
            AeadKey::Ring(key) => key
                .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::from(aad), in_out)
                .map(|plaintext| plaintext.len())
                .ok(),
            AeadKey::Aes128Ccm(ccm) => open_ccm(&**ccm, &nonce, aad, in_out, body_len),
            AeadKey::Aes128Ccm8(ccm) => open_ccm(&**ccm, &nonce, aad, in_out, body_len),
            AeadKey::Aes256Ccm(ccm) => open_ccm(&**ccm, &nonce, aad, in_out, body_len),
            AeadKey::Aes256Ccm8(ccm) => open_ccm(&**ccm, &nonce, aad, in_out, body_len),
        };
        Ok(opened)
    }

    /// Apply the AEAD keystream to `data` without checking the tag.
    pub(crate) fn aead_keystream(&self, nonce: [u8; 12], data: &mut [u8]) -> Result<(), ConfigError> {
        let key = self.write_key.as_bytes();
        let mut counter = [0u8; 16];

        match self.suite.mode {
            CipherMode::Gcm => {
                // J0 = nonce || 1; payload starts at counter 2
                counter[..12].copy_from_slice(&nonce);
                counter[15] = 2;
            }
            CipherMode::Ccm | CipherMode::Ccm8 => {
                // A_i = flags(L=3) || nonce || i; payload starts at i = 1
                counter[0] = 0x02;
                counter[1..13].copy_from_slice(&nonce);
                counter[15] = 1;
            }
            CipherMode::Poly1305 => {
                let mut chacha = chacha20::ChaCha20::new_from_slices(key, &nonce)
                    .map_err(|_| ConfigError::DerivationFailed("ChaCha20 key"))?;
                chacha.seek(64u64);
                chacha.apply_keystream(data);
                return Ok(());
            }
            CipherMode::Stream | CipherMode::Cbc => {
                return Err(ConfigError::DerivationFailed("not an AEAD cipher"))
            }
        }

        match self.suite.enc {
            BulkCipher::Aes128 => ctr::Ctr32BE::<Aes128>::new_from_slices(key, &counter)
                .map_err(|_| ConfigError::DerivationFailed("AES-CTR key"))?
                .apply_keystream(data),
            BulkCipher::Aes256 => ctr::Ctr32BE::<Aes256>::new_from_slices(key, &counter)
                .map_err(|_| ConfigError::DerivationFailed("AES-CTR key"))?
                .apply_keystream(data),
            _ => return Err(ConfigError::DerivationFailed("not an AES cipher")),
        }
        Ok(())
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("suite", &self.suite.name)
            .field("version", &self.version)
            .field("seq", &self.seq)
            .field("epoch", &self.epoch)
            .field("phase", &self.phase)
            .field("compression", &self.compression.is_some())
            .field("encrypt_then_mac", &self.encrypt_then_mac)
            .finish()
    }
}

fn open_ccm<A: AeadInPlace<NonceSize = U12>>(
    cipher: &A,
    nonce: &[u8; 12],
    aad: &[u8],
    in_out: &mut [u8],
    body_len: usize,
) -> Option<usize> {
    let (body, tag) = in_out.split_at_mut(body_len);
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            aad,
            body,
            GenericArray::from_slice(tag),
        )
        .ok()
        .map(|()| body_len)
}

// ============================================================================
// Cipher state
// ============================================================================

type Aes128Ccm = Ccm<Aes128, U16, U12>;
type Aes128Ccm8 = Ccm<Aes128, U8, U12>;
type Aes256Ccm = Ccm<Aes256, U16, U12>;
type Aes256Ccm8 = Ccm<Aes256, U8, U12>;

enum CipherState {
    Null,
    Rc4(Box<Rc4<U16>>),
    Cbc(BlockCipherKey),
    Aead(AeadKey),
}

enum BlockCipherKey {
    Des(Box<Des>),
    TripleDes(Box<TdesEde3>),
    Aes128(Box<Aes128>),
    Aes256(Box<Aes256>),
}

enum AeadKey {
    Ring(LessSafeKey),
    Aes128Ccm(Box<Aes128Ccm>),
    Aes128Ccm8(Box<Aes128Ccm8>),
    Aes256Ccm(Box<Aes256Ccm>),
    Aes256Ccm8(Box<Aes256Ccm8>),
}

impl CipherState {
    fn new(suite: &CipherSuiteDescriptor, key: &[u8]) -> Result<Self, ConfigError> {
        let expected = suite.key_len();
        if key.len() != expected {
            return Err(ConfigError::InvalidKeyLength {
                what: "write key",
                expected,
                actual: key.len(),
            });
        }
        let bad_key = || ConfigError::InvalidKeyLength {
            what: "write key",
            expected,
            actual: key.len(),
        };

        let state = match (suite.mode, suite.enc) {
            (CipherMode::Stream, BulkCipher::Null) => CipherState::Null,
            (CipherMode::Stream, BulkCipher::Rc4) => {
                CipherState::Rc4(Box::new(Rc4::new_from_slice(key).map_err(|_| bad_key())?))
            }
            (CipherMode::Cbc, BulkCipher::Des) => CipherState::Cbc(BlockCipherKey::Des(Box::new(
                Des::new_from_slice(key).map_err(|_| bad_key())?,
            ))),
            (CipherMode::Cbc, BulkCipher::TripleDes) => CipherState::Cbc(BlockCipherKey::TripleDes(
                Box::new(TdesEde3::new_from_slice(key).map_err(|_| bad_key())?),
            )),
            (CipherMode::Cbc, BulkCipher::Aes128) => CipherState::Cbc(BlockCipherKey::Aes128(
                Box::new(Aes128::new_from_slice(key).map_err(|_| bad_key())?),
            )),
            (CipherMode::Cbc, BulkCipher::Aes256) => CipherState::Cbc(BlockCipherKey::Aes256(
                Box::new(Aes256::new_from_slice(key).map_err(|_| bad_key())?),
            )),
            (CipherMode::Gcm, BulkCipher::Aes128) => ring_key(&AES_128_GCM, key)?,
            (CipherMode::Gcm, BulkCipher::Aes256) => ring_key(&AES_256_GCM, key)?,
            (CipherMode::Poly1305, BulkCipher::ChaCha20) => ring_key(&CHACHA20_POLY1305, key)?,
            (CipherMode::Ccm, BulkCipher::Aes128) => CipherState::Aead(AeadKey::Aes128Ccm(
                Box::new(Aes128Ccm::new_from_slice(key).map_err(|_| bad_key())?),
            )),
            (CipherMode::Ccm8, BulkCipher::Aes128) => CipherState::Aead(AeadKey::Aes128Ccm8(
                Box::new(Aes128Ccm8::new_from_slice(key).map_err(|_| bad_key())?),
            )),
            (CipherMode::Ccm, BulkCipher::Aes256) => CipherState::Aead(AeadKey::Aes256Ccm(
                Box::new(Aes256Ccm::new_from_slice(key).map_err(|_| bad_key())?),
            )),
            (CipherMode::Ccm8, BulkCipher::Aes256) => CipherState::Aead(AeadKey::Aes256Ccm8(
                Box::new(Aes256Ccm8::new_from_slice(key).map_err(|_| bad_key())?),
            )),
            _ => return Err(ConfigError::DerivationFailed("unsupported cipher/mode pair")),
        };
        Ok(state)
    }
}

fn ring_key(
    algorithm: &'static ring::aead::Algorithm,
    key: &[u8],
) -> Result<CipherState, ConfigError> {
    let unbound = UnboundKey::new(algorithm, key).map_err(|_| ConfigError::InvalidKeyLength {
        what: "AEAD key",
        expected: algorithm.key_len(),
        actual: key.len(),
    })?;
    Ok(CipherState::Aead(AeadKey::Ring(LessSafeKey::new(unbound))))
}

impl BlockCipherKey {
    fn block_len(&self) -> usize {
        match self {
            BlockCipherKey::Des(_) | BlockCipherKey::TripleDes(_) => 8,
            BlockCipherKey::Aes128(_) | BlockCipherKey::Aes256(_) => 16,
        }
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        match self {
            BlockCipherKey::Des(c) => c.decrypt_block(GenericArray::from_mut_slice(block)),
            BlockCipherKey::TripleDes(c) => c.decrypt_block(GenericArray::from_mut_slice(block)),
            BlockCipherKey::Aes128(c) => c.decrypt_block(GenericArray::from_mut_slice(block)),
            BlockCipherKey::Aes256(c) => c.decrypt_block(GenericArray::from_mut_slice(block)),
        }
    }
}
