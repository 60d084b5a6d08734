//! Protocol versions and the record-layer behaviour that hangs off them.

use std::fmt;

/// SSL, TLS or DTLS protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    Ssl30,
    Tls10,
    Tls11,
    Tls12,
    Tls13,
    Dtls10,
    Dtls12,
}

/// Which pseudo-random function a version uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrfFamily {
    /// SSLv3 MD5/SHA-1 letter construction
    Ssl3,
    /// P_MD5 XOR P_SHA1
    Tls10,
    /// Single P_hash keyed by the suite digest
    Tls12,
    /// HKDF-Expand-Label
    Tls13,
}

impl ProtocolVersion {
    /// Create from wire protocol version value.
    pub fn from_wire(version: u16) -> Option<Self> {
        match version {
            0x0300 => Some(ProtocolVersion::Ssl30),
            0x0301 => Some(ProtocolVersion::Tls10),
            0x0302 => Some(ProtocolVersion::Tls11),
            0x0303 => Some(ProtocolVersion::Tls12),
            0x0304 => Some(ProtocolVersion::Tls13),
            // 0x0100 is the pre-RFC OpenSSL DTLS version
            0xfeff | 0x0100 => Some(ProtocolVersion::Dtls10),
            0xfefd => Some(ProtocolVersion::Dtls12),
            _ => None,
        }
    }

    /// Get the wire protocol version value.
    pub fn to_wire(&self) -> u16 {
        match self {
            ProtocolVersion::Ssl30 => 0x0300,
            ProtocolVersion::Tls10 => 0x0301,
            ProtocolVersion::Tls11 => 0x0302,
            ProtocolVersion::Tls12 => 0x0303,
            ProtocolVersion::Tls13 => 0x0304,
            ProtocolVersion::Dtls10 => 0xfeff,
            ProtocolVersion::Dtls12 => 0xfefd,
        }
    }

    /// Version carried in the record header (TLS 1.3 records claim 1.2).
    pub fn record_version(&self) -> u16 {
        match self {
            ProtocolVersion::Tls13 => 0x0303,
            other => other.to_wire(),
        }
    }

    pub fn is_dtls(&self) -> bool {
        matches!(self, ProtocolVersion::Dtls10 | ProtocolVersion::Dtls12)
    }

    pub fn is_tls13(&self) -> bool {
        *self == ProtocolVersion::Tls13
    }

    /// CBC records start with an explicit IV block.
    pub fn has_explicit_iv(&self) -> bool {
        matches!(
            self,
            ProtocolVersion::Tls11
                | ProtocolVersion::Tls12
                | ProtocolVersion::Dtls10
                | ProtocolVersion::Dtls12
        )
    }

    /// AEAD cipher suites need TLS 1.2, DTLS 1.2 or newer.
    pub fn supports_aead(&self) -> bool {
        matches!(
            self,
            ProtocolVersion::Tls12 | ProtocolVersion::Tls13 | ProtocolVersion::Dtls12
        )
    }

    pub fn prf_family(&self) -> PrfFamily {
        match self {
            ProtocolVersion::Ssl30 => PrfFamily::Ssl3,
            ProtocolVersion::Tls10 | ProtocolVersion::Tls11 | ProtocolVersion::Dtls10 => {
                PrfFamily::Tls10
            }
            ProtocolVersion::Tls12 | ProtocolVersion::Dtls12 => PrfFamily::Tls12,
            ProtocolVersion::Tls13 => PrfFamily::Tls13,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolVersion::Ssl30 => "SSLv3",
            ProtocolVersion::Tls10 => "TLS 1.0",
            ProtocolVersion::Tls11 => "TLS 1.1",
            ProtocolVersion::Tls12 => "TLS 1.2",
            ProtocolVersion::Tls13 => "TLS 1.3",
            ProtocolVersion::Dtls10 => "DTLS 1.0",
            ProtocolVersion::Dtls12 => "DTLS 1.2",
        };
        f.write_str(name)
    }
}
