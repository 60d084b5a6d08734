//! Cipher suite registry.
//!
//! Maps the 16-bit suite id negotiated in ServerHello to the key exchange,
//! bulk cipher, digest and record protection mode it implies. Only suites
//! whose bulk cipher can be decrypted are listed; anything else is reported
//! as unknown.

use crate::error::ConfigError;
use crate::prf::HashAlgorithm;
use crate::version::ProtocolVersion;

/// Key exchange family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExchange {
    Rsa,
    Dh,
    Dhe,
    DhAnon,
    Ecdh,
    Ecdhe,
    Psk,
    DhePsk,
    RsaPsk,
    EcdhePsk,
    /// TLS 1.3 suites do not name a key exchange
    Tls13,
}

impl KeyExchange {
    /// Pre-master is RSA-encrypted in ClientKeyExchange.
    pub fn is_rsa(&self) -> bool {
        *self == KeyExchange::Rsa
    }

    /// Plain PSK, where the pre-master can be built from the key alone.
    pub fn is_psk(&self) -> bool {
        *self == KeyExchange::Psk
    }
}

/// Bulk encryption algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkCipher {
    Null,
    Rc4,
    Des,
    TripleDes,
    Aes128,
    Aes256,
    ChaCha20,
}

impl BulkCipher {
    /// Native key size in bytes.
    pub fn key_len(&self) -> usize {
        match self {
            BulkCipher::Null => 0,
            BulkCipher::Rc4 => 16,
            BulkCipher::Des => 8,
            BulkCipher::TripleDes => 24,
            BulkCipher::Aes128 => 16,
            BulkCipher::Aes256 => 32,
            BulkCipher::ChaCha20 => 32,
        }
    }

    /// Block size for block ciphers.
    pub fn block_len(&self) -> Option<usize> {
        match self {
            BulkCipher::Des | BulkCipher::TripleDes => Some(8),
            BulkCipher::Aes128 | BulkCipher::Aes256 => Some(16),
            _ => None,
        }
    }
}

/// Record protection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    Stream,
    Cbc,
    Gcm,
    Ccm,
    /// CCM with an 8-byte tag
    Ccm8,
    /// ChaCha20-Poly1305
    Poly1305,
}

impl CipherMode {
    pub fn is_aead(&self) -> bool {
        !matches!(self, CipherMode::Stream | CipherMode::Cbc)
    }

    pub fn tag_len(&self) -> usize {
        match self {
            CipherMode::Stream | CipherMode::Cbc => 0,
            CipherMode::Ccm8 => 8,
            _ => 16,
        }
    }
}

/// Static description of a cipher suite.
#[derive(Debug, PartialEq, Eq)]
pub struct CipherSuiteDescriptor {
    pub id: u16,
    pub name: &'static str,
    pub kex: KeyExchange,
    pub enc: BulkCipher,
    pub digest: HashAlgorithm,
    pub mode: CipherMode,
}

impl CipherSuiteDescriptor {
    /// MAC key and MAC output size (zero for AEAD suites).
    pub fn mac_len(&self) -> usize {
        if self.mode.is_aead() {
            0
        } else {
            self.digest.output_len()
        }
    }

    pub fn key_len(&self) -> usize {
        self.enc.key_len()
    }

    /// Write IV (CBC), implicit salt (GCM/CCM) or static IV (ChaCha20) size.
    pub fn iv_len(&self) -> usize {
        match self.mode {
            CipherMode::Stream => 0,
            CipherMode::Cbc => self.enc.block_len().unwrap_or(0),
            CipherMode::Gcm | CipherMode::Ccm | CipherMode::Ccm8 => 4,
            CipherMode::Poly1305 => 12,
        }
    }

    /// Key-block size of export-grade suites.
    pub fn export_key_len(&self) -> Option<usize> {
        if EXPORT40_SUITES.contains(&self.id) {
            Some(5)
        } else if EXPORT1024_SUITES.contains(&self.id) {
            Some(7)
        } else {
            None
        }
    }

    pub fn is_export(&self) -> bool {
        self.export_key_len().is_some()
    }

    /// Suites in the 0x13xx block exist only in TLS 1.3.
    pub fn is_tls13(&self) -> bool {
        self.kex == KeyExchange::Tls13
    }

    /// Reject suite/version pairs that cannot be decrypted together.
    pub fn check_version(&self, version: ProtocolVersion) -> Result<(), ConfigError> {
        let mismatch = ConfigError::VersionMismatch {
            suite: self.id,
            version,
        };
        if self.is_tls13() != version.is_tls13() {
            return Err(mismatch);
        }
        if self.mode.is_aead() && !version.supports_aead() {
            return Err(mismatch);
        }
        Ok(())
    }
}

/// Export suites limited to 40-bit keys.
const EXPORT40_SUITES: &[u16] = &[0x0003, 0x0008, 0x000b, 0x000e, 0x0011, 0x0014, 0x0017, 0x0019];

/// EXPORT1024 suites with 56-bit keys.
const EXPORT1024_SUITES: &[u16] = &[0x0060, 0x0062, 0x0063, 0x0064, 0x0065];

/// Look up a cipher suite by id.
pub fn lookup(id: u16) -> Option<&'static CipherSuiteDescriptor> {
    CIPHER_SUITES
        .binary_search_by_key(&id, |suite| suite.id)
        .ok()
        .map(|idx| &CIPHER_SUITES[idx])
}

/// Like [`lookup`], but reports unknown ids as a [`ConfigError`].
pub fn require(id: u16) -> Result<&'static CipherSuiteDescriptor, ConfigError> {
    lookup(id).ok_or(ConfigError::UnknownCipherSuite(id))
}

/// All known suites, sorted by id.
pub fn all() -> &'static [CipherSuiteDescriptor] {
    CIPHER_SUITES
}

const fn cs(
    id: u16,
    name: &'static str,
    kex: KeyExchange,
    enc: BulkCipher,
    digest: HashAlgorithm,
    mode: CipherMode,
) -> CipherSuiteDescriptor {
    CipherSuiteDescriptor {
        id,
        name,
        kex,
        enc,
        digest,
        mode,
    }
}

use self::BulkCipher::*;
use self::CipherMode::*;
use self::KeyExchange::*;
use crate::prf::HashAlgorithm::*;

// Sorted by id for binary search.
static CIPHER_SUITES: &[CipherSuiteDescriptor] = &[
    cs(0x0001, "TLS_RSA_WITH_NULL_MD5", Rsa, Null, Md5, Stream),
    cs(0x0002, "TLS_RSA_WITH_NULL_SHA", Rsa, Null, Sha1, Stream),
    cs(0x0003, "TLS_RSA_EXPORT_WITH_RC4_40_MD5", Rsa, Rc4, Md5, Stream),
    cs(0x0004, "TLS_RSA_WITH_RC4_128_MD5", Rsa, Rc4, Md5, Stream),
    cs(0x0005, "TLS_RSA_WITH_RC4_128_SHA", Rsa, Rc4, Sha1, Stream),
    cs(0x0008, "TLS_RSA_EXPORT_WITH_DES40_CBC_SHA", Rsa, Des, Sha1, Cbc),
    cs(0x0009, "TLS_RSA_WITH_DES_CBC_SHA", Rsa, Des, Sha1, Cbc),
    cs(0x000A, "TLS_RSA_WITH_3DES_EDE_CBC_SHA", Rsa, TripleDes, Sha1, Cbc),
    cs(0x000B, "TLS_DH_DSS_EXPORT_WITH_DES40_CBC_SHA", Dh, Des, Sha1, Cbc),
    cs(0x000C, "TLS_DH_DSS_WITH_DES_CBC_SHA", Dh, Des, Sha1, Cbc),
    cs(0x000D, "TLS_DH_DSS_WITH_3DES_EDE_CBC_SHA", Dh, TripleDes, Sha1, Cbc),
    cs(0x000E, "TLS_DH_RSA_EXPORT_WITH_DES40_CBC_SHA", Dh, Des, Sha1, Cbc),
    cs(0x000F, "TLS_DH_RSA_WITH_DES_CBC_SHA", Dh, Des, Sha1, Cbc),
    cs(0x0010, "TLS_DH_RSA_WITH_3DES_EDE_CBC_SHA", Dh, TripleDes, Sha1, Cbc),
    cs(0x0011, "TLS_DHE_DSS_EXPORT_WITH_DES40_CBC_SHA", Dhe, Des, Sha1, Cbc),
    cs(0x0012, "TLS_DHE_DSS_WITH_DES_CBC_SHA", Dhe, Des, Sha1, Cbc),
    cs(0x0013, "TLS_DHE_DSS_WITH_3DES_EDE_CBC_SHA", Dhe, TripleDes, Sha1, Cbc),
    cs(0x0014, "TLS_DHE_RSA_EXPORT_WITH_DES40_CBC_SHA", Dhe, Des, Sha1, Cbc),
    cs(0x0015, "TLS_DHE_RSA_WITH_DES_CBC_SHA", Dhe, Des, Sha1, Cbc),
    cs(0x0016, "TLS_DHE_RSA_WITH_3DES_EDE_CBC_SHA", Dhe, TripleDes, Sha1, Cbc),
    cs(0x0017, "TLS_DH_anon_EXPORT_WITH_RC4_40_MD5", DhAnon, Rc4, Md5, Stream),
    cs(0x0018, "TLS_DH_anon_WITH_RC4_128_MD5", DhAnon, Rc4, Md5, Stream),
    cs(0x0019, "TLS_DH_anon_EXPORT_WITH_DES40_CBC_SHA", DhAnon, Des, Sha1, Cbc),
    cs(0x001A, "TLS_DH_anon_WITH_DES_CBC_SHA", DhAnon, Des, Sha1, Cbc),
    cs(0x001B, "TLS_DH_anon_WITH_3DES_EDE_CBC_SHA", DhAnon, TripleDes, Sha1, Cbc),
    cs(0x002C, "TLS_PSK_WITH_NULL_SHA", Psk, Null, Sha1, Stream),
    cs(0x002D, "TLS_DHE_PSK_WITH_NULL_SHA", DhePsk, Null, Sha1, Stream),
    cs(0x002E, "TLS_RSA_PSK_WITH_NULL_SHA", RsaPsk, Null, Sha1, Stream),
    cs(0x002F, "TLS_RSA_WITH_AES_128_CBC_SHA", Rsa, Aes128, Sha1, Cbc),
    cs(0x0030, "TLS_DH_DSS_WITH_AES_128_CBC_SHA", Dh, Aes128, Sha1, Cbc),
    cs(0x0031, "TLS_DH_RSA_WITH_AES_128_CBC_SHA", Dh, Aes128, Sha1, Cbc),
    cs(0x0032, "TLS_DHE_DSS_WITH_AES_128_CBC_SHA", Dhe, Aes128, Sha1, Cbc),
    cs(0x0033, "TLS_DHE_RSA_WITH_AES_128_CBC_SHA", Dhe, Aes128, Sha1, Cbc),
    cs(0x0034, "TLS_DH_anon_WITH_AES_128_CBC_SHA", DhAnon, Aes128, Sha1, Cbc),
    cs(0x0035, "TLS_RSA_WITH_AES_256_CBC_SHA", Rsa, Aes256, Sha1, Cbc),
    cs(0x0036, "TLS_DH_DSS_WITH_AES_256_CBC_SHA", Dh, Aes256, Sha1, Cbc),
    cs(0x0037, "TLS_DH_RSA_WITH_AES_256_CBC_SHA", Dh, Aes256, Sha1, Cbc),
    cs(0x0038, "TLS_DHE_DSS_WITH_AES_256_CBC_SHA", Dhe, Aes256, Sha1, Cbc),
    cs(0x0039, "TLS_DHE_RSA_WITH_AES_256_CBC_SHA", Dhe, Aes256, Sha1, Cbc),
    cs(0x003A, "TLS_DH_anon_WITH_AES_256_CBC_SHA", DhAnon, Aes256, Sha1, Cbc),
    cs(0x003B, "TLS_RSA_WITH_NULL_SHA256", Rsa, Null, Sha256, Stream),
    cs(0x003C, "TLS_RSA_WITH_AES_128_CBC_SHA256", Rsa, Aes128, Sha256, Cbc),
    cs(0x003D, "TLS_RSA_WITH_AES_256_CBC_SHA256", Rsa, Aes256, Sha256, Cbc),
    cs(0x003E, "TLS_DH_DSS_WITH_AES_128_CBC_SHA256", Dh, Aes128, Sha256, Cbc),
    cs(0x003F, "TLS_DH_RSA_WITH_AES_128_CBC_SHA256", Dh, Aes128, Sha256, Cbc),
    cs(0x0040, "TLS_DHE_DSS_WITH_AES_128_CBC_SHA256", Dhe, Aes128, Sha256, Cbc),
    cs(0x0060, "TLS_RSA_EXPORT1024_WITH_RC4_56_MD5", Rsa, Rc4, Md5, Stream),
    cs(0x0062, "TLS_RSA_EXPORT1024_WITH_DES_CBC_SHA", Rsa, Des, Sha1, Cbc),
    cs(0x0063, "TLS_DHE_DSS_EXPORT1024_WITH_DES_CBC_SHA", Dhe, Des, Sha1, Cbc),
    cs(0x0064, "TLS_RSA_EXPORT1024_WITH_RC4_56_SHA", Rsa, Rc4, Sha1, Stream),
    cs(0x0065, "TLS_DHE_DSS_EXPORT1024_WITH_RC4_56_SHA", Dhe, Rc4, Sha1, Stream),
    cs(0x0066, "TLS_DHE_DSS_WITH_RC4_128_SHA", Dhe, Rc4, Sha1, Stream),
    cs(0x0067, "TLS_DHE_RSA_WITH_AES_128_CBC_SHA256", Dhe, Aes128, Sha256, Cbc),
    cs(0x0068, "TLS_DH_DSS_WITH_AES_256_CBC_SHA256", Dh, Aes256, Sha256, Cbc),
    cs(0x0069, "TLS_DH_RSA_WITH_AES_256_CBC_SHA256", Dh, Aes256, Sha256, Cbc),
    cs(0x006A, "TLS_DHE_DSS_WITH_AES_256_CBC_SHA256", Dhe, Aes256, Sha256, Cbc),
    cs(0x006B, "TLS_DHE_RSA_WITH_AES_256_CBC_SHA256", Dhe, Aes256, Sha256, Cbc),
    cs(0x006C, "TLS_DH_anon_WITH_AES_128_CBC_SHA256", DhAnon, Aes128, Sha256, Cbc),
    cs(0x006D, "TLS_DH_anon_WITH_AES_256_CBC_SHA256", DhAnon, Aes256, Sha256, Cbc),
    cs(0x008A, "TLS_PSK_WITH_RC4_128_SHA", Psk, Rc4, Sha1, Stream),
    cs(0x008B, "TLS_PSK_WITH_3DES_EDE_CBC_SHA", Psk, TripleDes, Sha1, Cbc),
    cs(0x008C, "TLS_PSK_WITH_AES_128_CBC_SHA", Psk, Aes128, Sha1, Cbc),
    cs(0x008D, "TLS_PSK_WITH_AES_256_CBC_SHA", Psk, Aes256, Sha1, Cbc),
    cs(0x008E, "TLS_DHE_PSK_WITH_RC4_128_SHA", DhePsk, Rc4, Sha1, Stream),
    cs(0x008F, "TLS_DHE_PSK_WITH_3DES_EDE_CBC_SHA", DhePsk, TripleDes, Sha1, Cbc),
    cs(0x0090, "TLS_DHE_PSK_WITH_AES_128_CBC_SHA", DhePsk, Aes128, Sha1, Cbc),
    cs(0x0091, "TLS_DHE_PSK_WITH_AES_256_CBC_SHA", DhePsk, Aes256, Sha1, Cbc),
    cs(0x0092, "TLS_RSA_PSK_WITH_RC4_128_SHA", RsaPsk, Rc4, Sha1, Stream),
    cs(0x0093, "TLS_RSA_PSK_WITH_3DES_EDE_CBC_SHA", RsaPsk, TripleDes, Sha1, Cbc),
    cs(0x0094, "TLS_RSA_PSK_WITH_AES_128_CBC_SHA", RsaPsk, Aes128, Sha1, Cbc),
    cs(0x0095, "TLS_RSA_PSK_WITH_AES_256_CBC_SHA", RsaPsk, Aes256, Sha1, Cbc),
    cs(0x009C, "TLS_RSA_WITH_AES_128_GCM_SHA256", Rsa, Aes128, Sha256, Gcm),
    cs(0x009D, "TLS_RSA_WITH_AES_256_GCM_SHA384", Rsa, Aes256, Sha384, Gcm),
    cs(0x009E, "TLS_DHE_RSA_WITH_AES_128_GCM_SHA256", Dhe, Aes128, Sha256, Gcm),
    cs(0x009F, "TLS_DHE_RSA_WITH_AES_256_GCM_SHA384", Dhe, Aes256, Sha384, Gcm),
    cs(0x00A0, "TLS_DH_RSA_WITH_AES_128_GCM_SHA256", Dh, Aes128, Sha256, Gcm),
    cs(0x00A1, "TLS_DH_RSA_WITH_AES_256_GCM_SHA384", Dh, Aes256, Sha384, Gcm),
    cs(0x00A2, "TLS_DHE_DSS_WITH_AES_128_GCM_SHA256", Dhe, Aes128, Sha256, Gcm),
    cs(0x00A3, "TLS_DHE_DSS_WITH_AES_256_GCM_SHA384", Dhe, Aes256, Sha384, Gcm),
    cs(0x00A4, "TLS_DH_DSS_WITH_AES_128_GCM_SHA256", Dh, Aes128, Sha256, Gcm),
    cs(0x00A5, "TLS_DH_DSS_WITH_AES_256_GCM_SHA384", Dh, Aes256, Sha384, Gcm),
    cs(0x00A6, "TLS_DH_anon_WITH_AES_128_GCM_SHA256", DhAnon, Aes128, Sha256, Gcm),
    cs(0x00A7, "TLS_DH_anon_WITH_AES_256_GCM_SHA384", DhAnon, Aes256, Sha384, Gcm),
    cs(0x00A8, "TLS_PSK_WITH_AES_128_GCM_SHA256", Psk, Aes128, Sha256, Gcm),
    cs(0x00A9, "TLS_PSK_WITH_AES_256_GCM_SHA384", Psk, Aes256, Sha384, Gcm),
    cs(0x00AA, "TLS_DHE_PSK_WITH_AES_128_GCM_SHA256", DhePsk, Aes128, Sha256, Gcm),
    cs(0x00AB, "TLS_DHE_PSK_WITH_AES_256_GCM_SHA384", DhePsk, Aes256, Sha384, Gcm),
    cs(0x00AC, "TLS_RSA_PSK_WITH_AES_128_GCM_SHA256", RsaPsk, Aes128, Sha256, Gcm),
    cs(0x00AD, "TLS_RSA_PSK_WITH_AES_256_GCM_SHA384", RsaPsk, Aes256, Sha384, Gcm),
    cs(0x00AE, "TLS_PSK_WITH_AES_128_CBC_SHA256", Psk, Aes128, Sha256, Cbc),
    cs(0x00AF, "TLS_PSK_WITH_AES_256_CBC_SHA384", Psk, Aes256, Sha384, Cbc),
    cs(0x00B0, "TLS_PSK_WITH_NULL_SHA256", Psk, Null, Sha256, Stream),
    cs(0x00B1, "TLS_PSK_WITH_NULL_SHA384", Psk, Null, Sha384, Stream),
    cs(0x00B2, "TLS_DHE_PSK_WITH_AES_128_CBC_SHA256", DhePsk, Aes128, Sha256, Cbc),
    cs(0x00B3, "TLS_DHE_PSK_WITH_AES_256_CBC_SHA384", DhePsk, Aes256, Sha384, Cbc),
    cs(0x00B4, "TLS_DHE_PSK_WITH_NULL_SHA256", DhePsk, Null, Sha256, Stream),
    cs(0x00B5, "TLS_DHE_PSK_WITH_NULL_SHA384", DhePsk, Null, Sha384, Stream),
    cs(0x00B6, "TLS_RSA_PSK_WITH_AES_128_CBC_SHA256", RsaPsk, Aes128, Sha256, Cbc),
    cs(0x00B7, "TLS_RSA_PSK_WITH_AES_256_CBC_SHA384", RsaPsk, Aes256, Sha384, Cbc),
    cs(0x00B8, "TLS_RSA_PSK_WITH_NULL_SHA256", RsaPsk, Null, Sha256, Stream),
    cs(0x00B9, "TLS_RSA_PSK_WITH_NULL_SHA384", RsaPsk, Null, Sha384, Stream),
    cs(0x1301, "TLS_AES_128_GCM_SHA256", Tls13, Aes128, Sha256, Gcm),
    cs(0x1302, "TLS_AES_256_GCM_SHA384", Tls13, Aes256, Sha384, Gcm),
    cs(0x1303, "TLS_CHACHA20_POLY1305_SHA256", Tls13, ChaCha20, Sha256, Poly1305),
    cs(0x1304, "TLS_AES_128_CCM_SHA256", Tls13, Aes128, Sha256, Ccm),
    cs(0x1305, "TLS_AES_128_CCM_8_SHA256", Tls13, Aes128, Sha256, Ccm8),
    cs(0xC001, "TLS_ECDH_ECDSA_WITH_NULL_SHA", Ecdh, Null, Sha1, Stream),
    cs(0xC002, "TLS_ECDH_ECDSA_WITH_RC4_128_SHA", Ecdh, Rc4, Sha1, Stream),
    cs(0xC003, "TLS_ECDH_ECDSA_WITH_3DES_EDE_CBC_SHA", Ecdh, TripleDes, Sha1, Cbc),
    cs(0xC004, "TLS_ECDH_ECDSA_WITH_AES_128_CBC_SHA", Ecdh, Aes128, Sha1, Cbc),
    cs(0xC005, "TLS_ECDH_ECDSA_WITH_AES_256_CBC_SHA", Ecdh, Aes256, Sha1, Cbc),
    cs(0xC006, "TLS_ECDHE_ECDSA_WITH_NULL_SHA", Ecdhe, Null, Sha1, Stream),
    cs(0xC007, "TLS_ECDHE_ECDSA_WITH_RC4_128_SHA", Ecdhe, Rc4, Sha1, Stream),
    cs(0xC008, "TLS_ECDHE_ECDSA_WITH_3DES_EDE_CBC_SHA", Ecdhe, TripleDes, Sha1, Cbc),
    cs(0xC009, "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA", Ecdhe, Aes128, Sha1, Cbc),
    cs(0xC00A, "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA", Ecdhe, Aes256, Sha1, Cbc),
    cs(0xC00B, "TLS_ECDH_RSA_WITH_NULL_SHA", Ecdh, Null, Sha1, Stream),
    cs(0xC00C, "TLS_ECDH_RSA_WITH_RC4_128_SHA", Ecdh, Rc4, Sha1, Stream),
    cs(0xC00D, "TLS_ECDH_RSA_WITH_3DES_EDE_CBC_SHA", Ecdh, TripleDes, Sha1, Cbc),
    cs(0xC00E, "TLS_ECDH_RSA_WITH_AES_128_CBC_SHA", Ecdh, Aes128, Sha1, Cbc),
    cs(0xC00F, "TLS_ECDH_RSA_WITH_AES_256_CBC_SHA", Ecdh, Aes256, Sha1, Cbc),
    cs(0xC010, "TLS_ECDHE_RSA_WITH_NULL_SHA", Ecdhe, Null, Sha1, Stream),
    cs(0xC011, "TLS_ECDHE_RSA_WITH_RC4_128_SHA", Ecdhe, Rc4, Sha1, Stream),
    cs(0xC012, "TLS_ECDHE_RSA_WITH_3DES_EDE_CBC_SHA", Ecdhe, TripleDes, Sha1, Cbc),
    cs(0xC013, "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA", Ecdhe, Aes128, Sha1, Cbc),
    cs(0xC014, "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA", Ecdhe, Aes256, Sha1, Cbc),
    cs(0xC023, "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256", Ecdhe, Aes128, Sha256, Cbc),
    cs(0xC024, "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384", Ecdhe, Aes256, Sha384, Cbc),
    cs(0xC025, "TLS_ECDH_ECDSA_WITH_AES_128_CBC_SHA256", Ecdh, Aes128, Sha256, Cbc),
    cs(0xC026, "TLS_ECDH_ECDSA_WITH_AES_256_CBC_SHA384", Ecdh, Aes256, Sha384, Cbc),
    cs(0xC027, "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256", Ecdhe, Aes128, Sha256, Cbc),
    cs(0xC028, "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384", Ecdhe, Aes256, Sha384, Cbc),
    cs(0xC029, "TLS_ECDH_RSA_WITH_AES_128_CBC_SHA256", Ecdh, Aes128, Sha256, Cbc),
    cs(0xC02A, "TLS_ECDH_RSA_WITH_AES_256_CBC_SHA384", Ecdh, Aes256, Sha384, Cbc),
    cs(0xC02B, "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256", Ecdhe, Aes128, Sha256, Gcm),
    cs(0xC02C, "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384", Ecdhe, Aes256, Sha384, Gcm),
    cs(0xC02D, "TLS_ECDH_ECDSA_WITH_AES_128_GCM_SHA256", Ecdh, Aes128, Sha256, Gcm),
    cs(0xC02E, "TLS_ECDH_ECDSA_WITH_AES_256_GCM_SHA384", Ecdh, Aes256, Sha384, Gcm),
    cs(0xC02F, "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256", Ecdhe, Aes128, Sha256, Gcm),
    cs(0xC030, "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384", Ecdhe, Aes256, Sha384, Gcm),
    cs(0xC031, "TLS_ECDH_RSA_WITH_AES_128_GCM_SHA256", Ecdh, Aes128, Sha256, Gcm),
    cs(0xC032, "TLS_ECDH_RSA_WITH_AES_256_GCM_SHA384", Ecdh, Aes256, Sha384, Gcm),
    cs(0xC035, "TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA", EcdhePsk, Aes128, Sha1, Cbc),
    cs(0xC036, "TLS_ECDHE_PSK_WITH_AES_256_CBC_SHA", EcdhePsk, Aes256, Sha1, Cbc),
    cs(0xC037, "TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA256", EcdhePsk, Aes128, Sha256, Cbc),
    cs(0xC038, "TLS_ECDHE_PSK_WITH_AES_256_CBC_SHA384", EcdhePsk, Aes256, Sha384, Cbc),
    cs(0xC09C, "TLS_RSA_WITH_AES_128_CCM", Rsa, Aes128, Sha256, Ccm),
    cs(0xC09D, "TLS_RSA_WITH_AES_256_CCM", Rsa, Aes256, Sha256, Ccm),
    cs(0xC09E, "TLS_DHE_RSA_WITH_AES_128_CCM", Dhe, Aes128, Sha256, Ccm),
    cs(0xC09F, "TLS_DHE_RSA_WITH_AES_256_CCM", Dhe, Aes256, Sha256, Ccm),
    cs(0xC0A0, "TLS_RSA_WITH_AES_128_CCM_8", Rsa, Aes128, Sha256, Ccm8),
    cs(0xC0A1, "TLS_RSA_WITH_AES_256_CCM_8", Rsa, Aes256, Sha256, Ccm8),
    cs(0xC0A2, "TLS_DHE_RSA_WITH_AES_128_CCM_8", Dhe, Aes128, Sha256, Ccm8),
    cs(0xC0A3, "TLS_DHE_RSA_WITH_AES_256_CCM_8", Dhe, Aes256, Sha256, Ccm8),
    cs(0xC0A4, "TLS_PSK_WITH_AES_128_CCM", Psk, Aes128, Sha256, Ccm),
    cs(0xC0A5, "TLS_PSK_WITH_AES_256_CCM", Psk, Aes256, Sha256, Ccm),
    cs(0xC0A6, "TLS_DHE_PSK_WITH_AES_128_CCM", DhePsk, Aes128, Sha256, Ccm),
    cs(0xC0A7, "TLS_DHE_PSK_WITH_AES_256_CCM", DhePsk, Aes256, Sha256, Ccm),
    cs(0xC0A8, "TLS_PSK_WITH_AES_128_CCM_8", Psk, Aes128, Sha256, Ccm8),
    cs(0xC0A9, "TLS_PSK_WITH_AES_256_CCM_8", Psk, Aes256, Sha256, Ccm8),
    cs(0xC0AA, "TLS_PSK_DHE_WITH_AES_128_CCM_8", DhePsk, Aes128, Sha256, Ccm8),
    cs(0xC0AB, "TLS_PSK_DHE_WITH_AES_256_CCM_8", DhePsk, Aes256, Sha256, Ccm8),
    cs(0xC0AC, "TLS_ECDHE_ECDSA_WITH_AES_128_CCM", Ecdhe, Aes128, Sha256, Ccm),
    cs(0xC0AD, "TLS_ECDHE_ECDSA_WITH_AES_256_CCM", Ecdhe, Aes256, Sha256, Ccm),
    cs(0xC0AE, "TLS_ECDHE_ECDSA_WITH_AES_128_CCM_8", Ecdhe, Aes128, Sha256, Ccm8),
    cs(0xC0AF, "TLS_ECDHE_ECDSA_WITH_AES_256_CCM_8", Ecdhe, Aes256, Sha256, Ccm8),
    cs(0xCCA8, "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256", Ecdhe, ChaCha20, Sha256, Poly1305),
    cs(0xCCA9, "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256", Ecdhe, ChaCha20, Sha256, Poly1305),
    cs(0xCCAA, "TLS_DHE_RSA_WITH_CHACHA20_POLY1305_SHA256", Dhe, ChaCha20, Sha256, Poly1305),
    cs(0xCCAB, "TLS_PSK_WITH_CHACHA20_POLY1305_SHA256", Psk, ChaCha20, Sha256, Poly1305),
    cs(0xCCAC, "TLS_ECDHE_PSK_WITH_CHACHA20_POLY1305_SHA256", EcdhePsk, ChaCha20, Sha256, Poly1305),
    cs(0xCCAD, "TLS_DHE_PSK_WITH_CHACHA20_POLY1305_SHA256", DhePsk, ChaCha20, Sha256, Poly1305),
    cs(0xCCAE, "TLS_RSA_PSK_WITH_CHACHA20_POLY1305_SHA256", RsaPsk, ChaCha20, Sha256, Poly1305),
    cs(0xD001, "TLS_ECDHE_PSK_WITH_AES_128_GCM_SHA256", EcdhePsk, Aes128, Sha256, Gcm),
    cs(0xD002, "TLS_ECDHE_PSK_WITH_AES_256_GCM_SHA384", EcdhePsk, Aes256, Sha384, Gcm),
    cs(0xD003, "TLS_ECDHE_PSK_WITH_AES_128_CCM_8_SHA256", EcdhePsk, Aes128, Sha256, Ccm8),
    cs(0xD005, "TLS_ECDHE_PSK_WITH_AES_128_CCM_SHA256", EcdhePsk, Aes128, Sha256, Ccm),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sorted_and_unique() {
        for pair in CIPHER_SUITES.windows(2) {
            assert!(pair[0].id < pair[1].id, "0x{:04x}", pair[1].id);
        }
    }

    #[test]
    fn test_lookup() {
        let suite = lookup(0x002f).unwrap();
        assert_eq!(suite.name, "TLS_RSA_WITH_AES_128_CBC_SHA");
        assert_eq!(suite.kex, KeyExchange::Rsa);
        assert_eq!(suite.mac_len(), 20);
        assert_eq!(suite.key_len(), 16);
        assert_eq!(suite.iv_len(), 16);

        let suite = lookup(0xc030).unwrap();
        assert_eq!(suite.digest, HashAlgorithm::Sha384);
        assert_eq!(suite.mac_len(), 0);
        assert_eq!(suite.iv_len(), 4);

        let suite = lookup(0xcca8).unwrap();
        assert_eq!(suite.iv_len(), 12);
        assert_eq!(suite.mode.tag_len(), 16);

        assert_eq!(lookup(0xc0a0).unwrap().mode.tag_len(), 8);
        assert!(lookup(0x0000).is_none());
        assert!(lookup(0xffff).is_none());
        assert_eq!(require(0x0007), Err(ConfigError::UnknownCipherSuite(0x0007)));
    }

    #[test]
    fn test_export_key_len() {
        assert_eq!(lookup(0x0003).unwrap().export_key_len(), Some(5));
        assert_eq!(lookup(0x0014).unwrap().export_key_len(), Some(5));
        assert_eq!(lookup(0x0062).unwrap().export_key_len(), Some(7));
        assert_eq!(lookup(0x0064).unwrap().export_key_len(), Some(7));
        assert_eq!(lookup(0x0004).unwrap().export_key_len(), None);
    }

    #[test]
    fn test_export_suites_are_registered() {
        for &id in EXPORT40_SUITES.iter().chain(EXPORT1024_SUITES) {
            let suite = lookup(id).unwrap_or_else(|| panic!("0x{id:04x} missing"));
            assert!(suite.is_export());
        }
        let registered = all().iter().filter(|s| s.is_export()).count();
        assert_eq!(registered, EXPORT40_SUITES.len() + EXPORT1024_SUITES.len());
    }

    #[test]
    fn test_check_version() {
        let tls13 = lookup(0x1301).unwrap();
        assert!(tls13.check_version(ProtocolVersion::Tls13).is_ok());
        assert!(matches!(
            tls13.check_version(ProtocolVersion::Tls12),
            Err(ConfigError::VersionMismatch { suite: 0x1301, .. })
        ));

        let gcm = lookup(0x009c).unwrap();
        assert!(gcm.check_version(ProtocolVersion::Tls12).is_ok());
        assert!(gcm.check_version(ProtocolVersion::Dtls12).is_ok());
        assert!(gcm.check_version(ProtocolVersion::Tls11).is_err());
        assert!(gcm.check_version(ProtocolVersion::Tls13).is_err());

        let cbc = lookup(0x002f).unwrap();
        assert!(cbc.check_version(ProtocolVersion::Ssl30).is_ok());
        assert!(cbc.check_version(ProtocolVersion::Dtls10).is_ok());
    }
}
