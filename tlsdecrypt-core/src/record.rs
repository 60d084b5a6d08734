//! Record decryption.
//!
//! Turns one protected record into plaintext using the state held in a
//! [`Decoder`]. Supported record protections:
//!
//! - stream ciphers (RC4, NULL) with a trailing MAC
//! - CBC with chained (SSLv3, TLS 1.0) or explicit (TLS 1.1+, DTLS) IVs,
//!   MAC-then-encrypt or encrypt-then-MAC (RFC 7366)
//! - TLS 1.2 AEAD (AES-GCM, AES-CCM, AES-CCM-8, ChaCha20-Poly1305)
//! - TLS 1.3 AEAD with inner content type recovery
//!
//! MACs are SSLv3 `H(k||pad2||H(k||pad1||seq||type||len||data))` or HMAC over
//! `seq||type||version||len||data`, where DTLS replaces `seq` with
//! `epoch||seq48`.

use subtle::ConstantTimeEq;
use tracing::{trace, warn};

use crate::config::DecryptConfig;
use crate::decoder::Decoder;
use crate::error::DecryptError;
use crate::prf::HashAlgorithm;
use crate::suites::CipherMode;
use crate::version::ProtocolVersion;

/// TLS record content types.
pub const CONTENT_CHANGE_CIPHER_SPEC: u8 = 20;
pub const CONTENT_ALERT: u8 = 21;
pub const CONTENT_HANDSHAKE: u8 = 22;
pub const CONTENT_APPLICATION_DATA: u8 = 23;

/// Decrypted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plaintext {
    /// Content type; for TLS 1.3 the inner type.
    pub content_type: u8,
    pub data: Vec<u8>,
    /// False when the MAC or tag failed and the codec ignores auth failures.
    pub authenticated: bool,
}

/// Record decryption with a configurable authentication policy.
#[derive(Debug, Clone, Default)]
pub struct RecordCodec {
    config: DecryptConfig,
}

/// Decrypt one record with the strict default policy.
pub fn decrypt_record(
    decoder: &mut Decoder,
    content_type: u8,
    record_version: u16,
    ciphertext: &[u8],
) -> Result<Plaintext, DecryptError> {
    RecordCodec::default().decrypt_record(decoder, content_type, record_version, ciphertext)
}

impl RecordCodec {
    pub fn new(config: DecryptConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecryptConfig {
        &self.config
    }

    /// Decrypt the next record of the decoder's direction.
    ///
    /// `content_type` and `record_version` are taken from the record header.
    pub fn decrypt_record(
        &self,
        decoder: &mut Decoder,
        content_type: u8,
        record_version: u16,
        ciphertext: &[u8],
    ) -> Result<Plaintext, DecryptError> {
        check_record_len(ciphertext)?;
        let plaintext = match decoder.suite().mode {
            CipherMode::Stream => {
                self.decrypt_stream(decoder, content_type, record_version, ciphertext)?
            }
            CipherMode::Cbc => self.decrypt_cbc(decoder, content_type, record_version, ciphertext)?,
            _ if decoder.version().is_tls13() => {
                self.decrypt_tls13(decoder, content_type, record_version, ciphertext)?
            }
            _ => self.decrypt_aead(decoder, content_type, record_version, ciphertext)?,
        };
        self.decompress(decoder, plaintext)
    }

    /// Decrypt a DTLS record whose header carries `epoch` and a 48-bit `seq`.
    pub fn decrypt_dtls_record(
        &self,
        decoder: &mut Decoder,
        content_type: u8,
        record_version: u16,
        epoch: u16,
        seq: u64,
        ciphertext: &[u8],
    ) -> Result<Plaintext, DecryptError> {
        check_record_len(ciphertext)?;
        decoder.set_epoch(epoch);
        decoder.set_seq(seq & DTLS_SEQ_MASK);
        self.decrypt_record(decoder, content_type, record_version, ciphertext)
    }

    // ========================================================================
    // Stream
    // ========================================================================

    fn decrypt_stream(
        &self,
        decoder: &mut Decoder,
        content_type: u8,
        record_version: u16,
        ciphertext: &[u8],
    ) -> Result<Plaintext, DecryptError> {
        let mac_len = decoder.suite().mac_len();
        if ciphertext.len() < mac_len {
            return Err(DecryptError::TruncatedInput {
                what: "stream record",
                needed: mac_len,
                have: ciphertext.len(),
            });
        }

        let mut data = ciphertext.to_vec();
        decoder.apply_stream(&mut data);

        let content_len = data.len() - mac_len;
        let seq = record_seq(decoder);
        let expected = compute_mac(decoder, seq, content_type, record_version, &data[..content_len])?;
        let authenticated = self.check_auth(
            bool::from(expected.ct_eq(&data[content_len..])),
            "MAC mismatch",
            seq,
        )?;

        data.truncate(content_len);
        Ok(Plaintext {
            content_type,
            data,
            authenticated,
        })
    }

    // ========================================================================
    // CBC
    // ========================================================================

    fn decrypt_cbc(
        &self,
        decoder: &mut Decoder,
        content_type: u8,
        record_version: u16,
        ciphertext: &[u8],
    ) -> Result<Plaintext, DecryptError> {
        let block_len = decoder.suite().iv_len();
        let mac_len = decoder.suite().mac_len();
        let explicit_iv = decoder.version().has_explicit_iv();
        let iv_len = if explicit_iv { block_len } else { 0 };

        if decoder.encrypt_then_mac() {
            return self.decrypt_cbc_etm(decoder, content_type, record_version, ciphertext);
        }

        // Smallest record: IV, then MAC plus one padding byte rounded up to a block.
        let needed = iv_len + (mac_len + 1).div_ceil(block_len) * block_len;
        if ciphertext.len() < needed || ciphertext.len() % block_len != 0 {
            return Err(DecryptError::TruncatedInput {
                what: "CBC record",
                needed: needed.max(ciphertext.len().div_ceil(block_len) * block_len),
                have: ciphertext.len(),
            });
        }

        let (iv, body) = split_iv(decoder, ciphertext, iv_len);
        let mut data = body.to_vec();
        decoder.decrypt_cbc(&iv, &mut data)?;
        if !explicit_iv {
            decoder.set_chained_iv(&body[body.len() - block_len..]);
        }

        // Padding is rejected before the MAC is looked at; seq stays put.
        let content_and_mac = strip_cbc_padding(decoder.version(), &data)?;
        if content_and_mac < mac_len {
            return Err(DecryptError::AuthenticationFailure {
                reason: "record shorter than MAC",
            });
        }
        let content_len = content_and_mac - mac_len;

        let seq = record_seq(decoder);
        let expected = compute_mac(decoder, seq, content_type, record_version, &data[..content_len])?;
        let authenticated = self.check_auth(
            bool::from(expected.ct_eq(&data[content_len..content_and_mac])),
            "MAC mismatch",
            seq,
        )?;

        data.truncate(content_len);
        Ok(Plaintext {
            content_type,
            data,
            authenticated,
        })
    }

    fn decrypt_cbc_etm(
        &self,
        decoder: &mut Decoder,
        content_type: u8,
        record_version: u16,
        ciphertext: &[u8],
    ) -> Result<Plaintext, DecryptError> {
        let block_len = decoder.suite().iv_len();
        let mac_len = decoder.suite().mac_len();
        let iv_len = if decoder.version().has_explicit_iv() {
            block_len
        } else {
            0
        };

        let needed = mac_len + iv_len + block_len;
        let body_len = ciphertext.len().saturating_sub(mac_len);
        if ciphertext.len() < needed || body_len % block_len != 0 {
            return Err(DecryptError::TruncatedInput {
                what: "encrypt-then-MAC record",
                needed,
                have: ciphertext.len(),
            });
        }
        let (body_with_iv, mac) = ciphertext.split_at(body_len);

        // MAC covers the IV and ciphertext and is checked before decrypting.
        let seq = record_seq(decoder);
        let expected = compute_mac(decoder, seq, content_type, record_version, body_with_iv)?;
        let verified = bool::from(expected.ct_eq(mac));

        let (iv, body) = split_iv(decoder, body_with_iv, iv_len);
        if iv_len == 0 {
            decoder.set_chained_iv(&body[body.len() - block_len..]);
        }
        let authenticated = self.check_auth(verified, "MAC mismatch", seq)?;

        let mut data = body.to_vec();
        decoder.decrypt_cbc(&iv, &mut data)?;
        let content_len = strip_cbc_padding(decoder.version(), &data)?;
        data.truncate(content_len);

        Ok(Plaintext {
            content_type,
            data,
            authenticated,
        })
    }

    // ========================================================================
    // AEAD
    // ========================================================================

    fn decrypt_aead(
        &self,
        decoder: &mut Decoder,
        content_type: u8,
        record_version: u16,
        ciphertext: &[u8],
    ) -> Result<Plaintext, DecryptError> {
        let mode = decoder.suite().mode;
        let tag_len = mode.tag_len();
        let explicit_len = if mode == CipherMode::Poly1305 { 0 } else { 8 };

        if ciphertext.len() < explicit_len + tag_len {
            return Err(DecryptError::TruncatedInput {
                what: "AEAD record",
                needed: explicit_len + tag_len,
                have: ciphertext.len(),
            });
        }
        let plaintext_len = ciphertext.len() - explicit_len - tag_len;

        let seq = record_seq(decoder);
        let nonce = if mode == CipherMode::Poly1305 {
            aead_nonce(decoder.write_iv(), seq)
        } else {
            let mut nonce = [0u8; 12];
            nonce[..4].copy_from_slice(decoder.write_iv());
            nonce[4..].copy_from_slice(&ciphertext[..8]);
            nonce
        };

        let plaintext_len_field = u16::try_from(plaintext_len).map_err(|_| {
            DecryptError::TruncatedInput {
                what: "AEAD record length",
                needed: usize::from(u16::MAX),
                have: plaintext_len,
            }
        })?;
        let mut aad = Vec::with_capacity(13);
        aad.extend_from_slice(&seq.to_be_bytes());
        aad.push(content_type);
        aad.extend_from_slice(&record_version.to_be_bytes());
        aad.extend_from_slice(&plaintext_len_field.to_be_bytes());

        let (data, authenticated) =
            self.open(decoder, nonce, &aad, &ciphertext[explicit_len..], seq)?;
        Ok(Plaintext {
            content_type,
            data,
            authenticated,
        })
    }

    fn decrypt_tls13(
        &self,
        decoder: &mut Decoder,
        outer_type: u8,
        record_version: u16,
        ciphertext: &[u8],
    ) -> Result<Plaintext, DecryptError> {
        let tag_len = decoder.suite().mode.tag_len();
        if ciphertext.len() <= tag_len {
            return Err(DecryptError::TruncatedInput {
                what: "TLS 1.3 record",
                needed: tag_len + 1,
                have: ciphertext.len(),
            });
        }
        let length = u16::try_from(ciphertext.len()).map_err(|_| DecryptError::TruncatedInput {
            what: "TLS 1.3 record length",
            needed: usize::from(u16::MAX),
            have: ciphertext.len(),
        })?;

        let seq = record_seq(decoder);
        let nonce = aead_nonce(decoder.write_iv(), seq);

        // Final protocol authenticates the record header, drafts nothing
        let mut header = [0u8; 5];
        header[0] = outer_type;
        header[1..3].copy_from_slice(&record_version.to_be_bytes());
        header[3..].copy_from_slice(&length.to_be_bytes());
        let aad: &[u8] = if self.config.tls13_revision.header_is_aad() {
            &header
        } else {
            &[]
        };

        let (mut data, authenticated) = self.open(decoder, nonce, aad, ciphertext, seq)?;
        let content_type =
            strip_tls13_padding(&mut data).ok_or(DecryptError::TruncatedInput {
                what: "TLS 1.3 inner plaintext",
                needed: 1,
                have: 0,
            })?;

        Ok(Plaintext {
            content_type,
            data,
            authenticated,
        })
    }

    /// Open `sealed` (ciphertext then tag), falling back to the bare
    /// keystream when auth failures are ignored.
    fn open(
        &self,
        decoder: &Decoder,
        nonce: [u8; 12],
        aad: &[u8],
        sealed: &[u8],
        seq: u64,
    ) -> Result<(Vec<u8>, bool), DecryptError> {
        let mut in_out = sealed.to_vec();
        if let Some(len) = decoder.open_aead(nonce, aad, &mut in_out)? {
            in_out.truncate(len);
            return Ok((in_out, true));
        }

        self.check_auth(false, "AEAD tag mismatch", seq)?;
        let body_len = sealed.len() - decoder.suite().mode.tag_len();
        let mut data = sealed[..body_len].to_vec();
        decoder.aead_keystream(nonce, &mut data)?;
        Ok((data, false))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Apply the authentication policy to a check result.
    fn check_auth(&self, ok: bool, reason: &'static str, seq: u64) -> Result<bool, DecryptError> {
        if ok {
            return Ok(true);
        }
        if self.config.ignore_auth_failures {
            warn!(seq, reason, "authentication failed, returning unverified plaintext");
            return Ok(false);
        }
        Err(DecryptError::AuthenticationFailure { reason })
    }

    fn decompress(
        &self,
        decoder: &mut Decoder,
        mut plaintext: Plaintext,
    ) -> Result<Plaintext, DecryptError> {
        let limit = self.config.max_decompressed_len;
        if self.config.decompress && plaintext.authenticated {
            if let Some(decompressor) = decoder.decompressor() {
                plaintext.data = decompressor.decompress(&plaintext.data, limit)?;
            }
        }
        trace!(
            seq = decoder.seq(),
            content_type = plaintext.content_type,
            len = plaintext.data.len(),
            "decrypted record"
        );
        Ok(plaintext)
    }
}

const DTLS_SEQ_MASK: u64 = 0xffff_ffff_ffff;

/// Reject payloads no record header can describe, before any decoder
/// state moves.
fn check_record_len(ciphertext: &[u8]) -> Result<(), DecryptError> {
    if ciphertext.len() > usize::from(u16::MAX) {
        return Err(DecryptError::TruncatedInput {
            what: "record length",
            needed: usize::from(u16::MAX),
            have: ciphertext.len(),
        });
    }
    Ok(())
}

/// Take the record's sequence number, advancing the decoder.
///
/// DTLS folds the epoch into the top 16 bits.
fn record_seq(decoder: &mut Decoder) -> u64 {
    let seq = decoder.next_seq();
    if decoder.version().is_dtls() {
        (u64::from(decoder.epoch()) << 48) | (seq & DTLS_SEQ_MASK)
    } else {
        seq
    }
}

/// Split off the explicit IV, or use the chained one.
fn split_iv<'a>(decoder: &Decoder, record: &'a [u8], iv_len: usize) -> (Vec<u8>, &'a [u8]) {
    if iv_len > 0 {
        let (iv, body) = record.split_at(iv_len);
        (iv.to_vec(), body)
    } else {
        (decoder.write_iv().to_vec(), record)
    }
}

/// Per-record AEAD nonce: `iv XOR (0^4 || seq_be64)`.
pub fn aead_nonce(iv: &[u8], seq: u64) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    let len = iv.len().min(12);
    nonce[..len].copy_from_slice(&iv[..len]);
    for (n, s) in nonce[4..].iter_mut().zip(seq.to_be_bytes()) {
        *n ^= s;
    }
    nonce
}

/// Validate CBC padding and return the length of content plus MAC.
///
/// TLS requires every padding byte to equal the length byte; SSLv3 only
/// bounds the length. Not constant time.
pub fn strip_cbc_padding(version: ProtocolVersion, data: &[u8]) -> Result<usize, DecryptError> {
    let bad_padding = DecryptError::AuthenticationFailure {
        reason: "bad padding",
    };
    let Some(&pad) = data.last() else {
        return Err(bad_padding);
    };
    let pad_total = usize::from(pad) + 1;
    if pad_total > data.len() {
        return Err(bad_padding);
    }

    let start = data.len() - pad_total;
    if version != ProtocolVersion::Ssl30 && data[start..].iter().any(|&b| b != pad) {
        return Err(bad_padding);
    }
    Ok(start)
}

/// Remove TLS 1.3 zero padding and the trailing content type.
///
/// Returns `None` when the inner plaintext is all zeros.
pub fn strip_tls13_padding(data: &mut Vec<u8>) -> Option<u8> {
    let type_pos = data.iter().rposition(|&b| b != 0)?;
    let content_type = data[type_pos];
    data.truncate(type_pos);
    Some(content_type)
}

fn compute_mac(
    decoder: &Decoder,
    seq: u64,
    content_type: u8,
    record_version: u16,
    data: &[u8],
) -> Result<Vec<u8>, DecryptError> {
    let digest = decoder.suite().digest;
    let key = decoder.mac_key();
    let seq = seq.to_be_bytes();
    let len = u16::try_from(data.len())
        .map_err(|_| DecryptError::TruncatedInput {
            what: "MAC input length",
            needed: usize::from(u16::MAX),
            have: data.len(),
        })?
        .to_be_bytes();

    if decoder.version() == ProtocolVersion::Ssl30 {
        return Ok(ssl3_mac(digest, key, &seq, content_type, &len, data));
    }

    let mac = digest.hmac(
        key,
        &[&seq, &[content_type], &record_version.to_be_bytes(), &len, data],
    )?;
    Ok(mac)
}

/// SSLv3 MAC: hash(key + pad2 + hash(key + pad1 + seq + type + length + data)).
fn ssl3_mac(
    digest: HashAlgorithm,
    key: &[u8],
    seq: &[u8],
    content_type: u8,
    len: &[u8],
    data: &[u8],
) -> Vec<u8> {
    let pad_len = if digest == HashAlgorithm::Md5 { 48 } else { 40 };
    let pad1 = [0x36u8; 48];
    let pad2 = [0x5cu8; 48];

    let inner = digest.digest(&[key, &pad1[..pad_len], seq, &[content_type], len, data]);
    digest.digest(&[key, &pad2[..pad_len], &inner])
}
