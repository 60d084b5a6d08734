//! Pseudo-random functions for every protocol family.
//!
//! Implements:
//! - SSLv3 key expansion (SHA-1 then MD5 over a letter-prefixed counter)
//! - TLS 1.0/1.1 PRF (P_MD5 XOR P_SHA1 over the two halves of the secret)
//! - TLS 1.2 PRF (single P_hash, SHA-256 or SHA-384)
//! - TLS 1.3 HKDF-Expand-Label

use ::hmac::Mac;
use md5::{Digest, Md5};
use ring::hkdf::{self, KeyType, Prk, HKDF_SHA256, HKDF_SHA384};
use ring::{digest, hmac};

use crate::error::ConfigError;
use crate::version::{PrfFamily, ProtocolVersion};

type HmacMd5 = ::hmac::Hmac<Md5>;

/// Hash algorithm used for MACs and key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
}

impl HashAlgorithm {
    /// Get the output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "MD5",
            HashAlgorithm::Sha1 => "SHA1",
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha384 => "SHA384",
        }
    }

    fn ring_digest(&self) -> Option<&'static digest::Algorithm> {
        match self {
            HashAlgorithm::Md5 => None,
            HashAlgorithm::Sha1 => Some(&digest::SHA1_FOR_LEGACY_USE_ONLY),
            HashAlgorithm::Sha256 => Some(&digest::SHA256),
            HashAlgorithm::Sha384 => Some(&digest::SHA384),
        }
    }

    fn hmac_algorithm(&self) -> Option<hmac::Algorithm> {
        match self {
            HashAlgorithm::Md5 => None,
            HashAlgorithm::Sha1 => Some(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY),
            HashAlgorithm::Sha256 => Some(hmac::HMAC_SHA256),
            HashAlgorithm::Sha384 => Some(hmac::HMAC_SHA384),
        }
    }

    fn hkdf_algorithm(&self) -> Result<hkdf::Algorithm, ConfigError> {
        match self {
            HashAlgorithm::Sha256 => Ok(HKDF_SHA256),
            HashAlgorithm::Sha384 => Ok(HKDF_SHA384),
            _ => Err(ConfigError::UnsupportedDigest("HKDF")),
        }
    }

    /// Hash the concatenation of `parts`.
    pub fn digest(&self, parts: &[&[u8]]) -> Vec<u8> {
        match self.ring_digest() {
            Some(algorithm) => {
                let mut ctx = digest::Context::new(algorithm);
                for part in parts {
                    ctx.update(part);
                }
                ctx.finish().as_ref().to_vec()
            }
            None => {
                let mut hasher = Md5::new();
                for part in parts {
                    hasher.update(part);
                }
                hasher.finalize().to_vec()
            }
        }
    }

    /// HMAC over the concatenation of `parts`.
    pub fn hmac(&self, key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>, ConfigError> {
        HmacKey::new(*self, key)?.sign(parts)
    }
}

/// HMAC key for any [`HashAlgorithm`]; MD5 is not provided by ring.
enum HmacKey {
    Ring(hmac::Key),
    Md5(HmacMd5),
}

impl HmacKey {
    fn new(hash: HashAlgorithm, key: &[u8]) -> Result<Self, ConfigError> {
        match hash.hmac_algorithm() {
            Some(algorithm) => Ok(HmacKey::Ring(hmac::Key::new(algorithm, key))),
            None => HmacMd5::new_from_slice(key)
                .map(HmacKey::Md5)
                .map_err(|_| ConfigError::DerivationFailed("HMAC-MD5 key")),
        }
    }

    fn sign(&self, parts: &[&[u8]]) -> Result<Vec<u8>, ConfigError> {
        match self {
            HmacKey::Ring(key) => {
                let mut ctx = hmac::Context::with_key(key);
                for part in parts {
                    ctx.update(part);
                }
                Ok(ctx.sign().as_ref().to_vec())
            }
            HmacKey::Md5(mac) => {
                let mut mac = mac.clone();
                for part in parts {
                    mac.update(part);
                }
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    }
}

// ============================================================================
// SSLv3
// ============================================================================

/// SSLv3 key expansion.
///
/// block(i) = MD5(secret + SHA1(letters(i) + secret + seed))
///
/// where letters(0) = "A", letters(1) = "BB", letters(2) = "CCC", ...
/// SSLv3 has no label; the caller orders the randoms inside `seed`.
pub fn ssl3_prf(secret: &[u8], seed: &[u8], output_len: usize) -> Result<Vec<u8>, ConfigError> {
    const MAX_BLOCKS: usize = 26;
    if output_len > MAX_BLOCKS * 16 {
        return Err(ConfigError::DerivationFailed("SSLv3 key block too long"));
    }

    let mut result = Vec::with_capacity(output_len);
    let mut letters = Vec::with_capacity(MAX_BLOCKS);
    let mut i = 0u8;

    while result.len() < output_len {
        letters.clear();
        letters.resize(usize::from(i) + 1, b'A' + i);

        let sha = HashAlgorithm::Sha1.digest(&[&letters, secret, seed]);
        let block = HashAlgorithm::Md5.digest(&[secret, &sha]);

        let take = (output_len - result.len()).min(block.len());
        result.extend_from_slice(&block[..take]);
        i += 1;
    }

    Ok(result)
}

// ============================================================================
// TLS 1.0 - 1.2
// ============================================================================

/// TLS 1.0/1.1 PRF.
///
/// PRF(secret, label, seed) = P_MD5(S1, label + seed) XOR P_SHA-1(S2, label + seed)
///
/// S1 and S2 are both ceil(len/2) bytes long, so an odd-length secret
/// contributes its middle byte to both halves.
pub fn tls10_prf(
    secret: &[u8],
    label: &[u8],
    seed: &[u8],
    output_len: usize,
) -> Result<Vec<u8>, ConfigError> {
    let half = secret.len().div_ceil(2);
    let s1 = &secret[..half];
    let s2 = &secret[secret.len() - half..];

    let label_seed = [label, seed].concat();
    let mut md5 = p_hash(s1, &label_seed, output_len, HashAlgorithm::Md5)?;
    let sha = p_hash(s2, &label_seed, output_len, HashAlgorithm::Sha1)?;

    for (out, b) in md5.iter_mut().zip(sha.iter()) {
        *out ^= b;
    }
    Ok(md5)
}

/// TLS 1.2 PRF (Pseudo-Random Function).
///
/// PRF(secret, label, seed) = P_<hash>(secret, label + seed)
pub fn tls12_prf(
    secret: &[u8],
    label: &[u8],
    seed: &[u8],
    output_len: usize,
    hash_algo: HashAlgorithm,
) -> Result<Vec<u8>, ConfigError> {
    let label_seed = [label, seed].concat();
    p_hash(secret, &label_seed, output_len, hash_algo)
}

/// P_hash expansion function.
///
/// P_hash(secret, seed) = HMAC_hash(secret, A(1) + seed) +
///                        HMAC_hash(secret, A(2) + seed) + ...
///
/// With A(0) = seed, A(i) = HMAC_hash(secret, A(i-1))
fn p_hash(
    secret: &[u8],
    seed: &[u8],
    output_len: usize,
    hash_algo: HashAlgorithm,
) -> Result<Vec<u8>, ConfigError> {
    let key = HmacKey::new(hash_algo, secret)?;

    let mut result = Vec::with_capacity(output_len);
    let mut a = key.sign(&[seed])?;

    while result.len() < output_len {
        let block = key.sign(&[&a, seed])?;
        let take = (output_len - result.len()).min(block.len());
        result.extend_from_slice(&block[..take]);
        a = key.sign(&[&a])?;
    }

    Ok(result)
}

// ============================================================================
// TLS 1.3
// ============================================================================

/// HKDF-Expand-Label as defined in RFC 8446 section 7.1.
///
/// HKDF-Expand-Label(Secret, Label, Context, Length) =
///     HKDF-Expand(Secret, HkdfLabel, Length)
///
/// Where HkdfLabel = struct {
///     uint16 length = Length;
///     opaque label<7..255> = "tls13 " + Label;
///     opaque context<0..255> = Context;
/// };
pub fn hkdf_expand_label(
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    output_len: usize,
    hash_algo: HashAlgorithm,
) -> Result<Vec<u8>, ConfigError> {
    let info = hkdf_label(label, context, output_len)?;

    struct ExpandLen(usize);
    impl KeyType for ExpandLen {
        fn len(&self) -> usize {
            self.0
        }
    }

    // Traffic secrets are already HKDF-Extract output
    let prk = Prk::new_less_safe(hash_algo.hkdf_algorithm()?, secret);
    let info = [info.as_slice()];
    let okm = prk
        .expand(&info, ExpandLen(output_len))
        .map_err(|_| ConfigError::DerivationFailed("HKDF expand"))?;

    let mut output = vec![0u8; output_len];
    okm.fill(&mut output)
        .map_err(|_| ConfigError::DerivationFailed("HKDF fill"))?;
    Ok(output)
}

/// Encode the `HkdfLabel` structure.
pub fn hkdf_label(label: &[u8], context: &[u8], output_len: usize) -> Result<Vec<u8>, ConfigError> {
    const PREFIX: &[u8] = b"tls13 ";
    let full_len = PREFIX.len() + label.len();
    let length = u16::try_from(output_len)
        .map_err(|_| ConfigError::DerivationFailed("HKDF output length"))?;
    if full_len > 255 || context.len() > 255 {
        return Err(ConfigError::DerivationFailed("HKDF label too long"));
    }

    let mut info = Vec::with_capacity(2 + 1 + full_len + 1 + context.len());
    info.extend_from_slice(&length.to_be_bytes());
    info.push(full_len as u8);
    info.extend_from_slice(PREFIX);
    info.extend_from_slice(label);
    info.push(context.len() as u8);
    info.extend_from_slice(context);
    Ok(info)
}

// ============================================================================
// Dispatch
// ============================================================================

/// Hash that keys the PRF for a version/suite-digest pair.
///
/// Only meaningful for TLS 1.2 and later; older versions use fixed hashes.
pub fn prf_hash(suite_digest: HashAlgorithm) -> HashAlgorithm {
    match suite_digest {
        HashAlgorithm::Sha384 => HashAlgorithm::Sha384,
        _ => HashAlgorithm::Sha256,
    }
}

/// Version-dispatched expansion.
///
/// `seed2` is appended to `seed1` when present. For TLS 1.3 the seeds form
/// the HKDF context.
pub fn prf(
    version: ProtocolVersion,
    suite_digest: HashAlgorithm,
    secret: &[u8],
    label: &[u8],
    seed1: &[u8],
    seed2: Option<&[u8]>,
    output_len: usize,
) -> Result<Vec<u8>, ConfigError> {
    let seed = match seed2 {
        Some(seed2) => [seed1, seed2].concat(),
        None => seed1.to_vec(),
    };

    match version.prf_family() {
        PrfFamily::Ssl3 => ssl3_prf(secret, &seed, output_len),
        PrfFamily::Tls10 => tls10_prf(secret, label, &seed, output_len),
        PrfFamily::Tls12 => tls12_prf(secret, label, &seed, output_len, prf_hash(suite_digest)),
        PrfFamily::Tls13 => {
            hkdf_expand_label(secret, label, &seed, output_len, prf_hash(suite_digest))
        }
    }
}
