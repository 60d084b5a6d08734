//! Handshake transcript for the extended master secret (RFC 7627).

use crate::prf::{prf_hash, HashAlgorithm};
use crate::version::{PrfFamily, ProtocolVersion};

/// Concatenated handshake messages seen so far, ClientHello onwards.
#[derive(Debug, Clone, Default)]
pub struct HandshakeTranscript {
    buf: Vec<u8>,
}

impl HandshakeTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one handshake message including its 4-byte header.
    pub fn update(&mut self, message: &[u8]) {
        self.buf.extend_from_slice(message);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Session hash as defined for the negotiated PRF.
    ///
    /// TLS 1.0/1.1 hash with MD5 and SHA-1 concatenated; TLS 1.2 uses the PRF
    /// hash. SSLv3 and TLS 1.3 have no session hash.
    pub fn session_hash(
        &self,
        version: ProtocolVersion,
        suite_digest: HashAlgorithm,
    ) -> Option<Vec<u8>> {
        match version.prf_family() {
            PrfFamily::Tls10 => {
                let mut hash = HashAlgorithm::Md5.digest(&[&self.buf]);
                hash.extend(HashAlgorithm::Sha1.digest(&[&self.buf]));
                Some(hash)
            }
            PrfFamily::Tls12 => Some(prf_hash(suite_digest).digest(&[&self.buf])),
            PrfFamily::Ssl3 | PrfFamily::Tls13 => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_hash_lengths() {
        let mut transcript = HandshakeTranscript::new();
        transcript.update(b"\x01\x00\x00\x04abcd");
        transcript.update(b"\x02\x00\x00\x04efgh");
        assert_eq!(transcript.len(), 16);

        let tls10 = transcript
            .session_hash(ProtocolVersion::Tls10, HashAlgorithm::Sha1)
            .unwrap();
        assert_eq!(tls10.len(), 36);

        let tls12 = transcript
            .session_hash(ProtocolVersion::Tls12, HashAlgorithm::Sha1)
            .unwrap();
        assert_eq!(tls12, HashAlgorithm::Sha256.digest(&[transcript.as_bytes()]));

        let sha384 = transcript
            .session_hash(ProtocolVersion::Dtls12, HashAlgorithm::Sha384)
            .unwrap();
        assert_eq!(sha384.len(), 48);

        assert!(transcript
            .session_hash(ProtocolVersion::Ssl30, HashAlgorithm::Md5)
            .is_none());
    }

    #[test]
    fn test_clear() {
        let mut transcript = HandshakeTranscript::new();
        transcript.update(b"hello");
        transcript.clear();
        assert!(transcript.is_empty());
    }
}
