//! # tlsdecrypt-core
//!
//! Passive decryption engine for SSLv3, TLS 1.0 - 1.3, DTLS 1.0 and DTLS 1.2.
//!
//! Given handshake parameters observed on the wire and secrets from a key log
//! (or an RSA private key, or a pre-shared key), this crate derives the
//! session keys and decrypts protected records in both directions.
//!
//! ## Features
//!
//! - **Key Schedule**: SSLv3, TLS 1.0/1.1, TLS 1.2 PRFs and TLS 1.3
//!   HKDF-Expand-Label, extended master secret, export-grade key stretching
//! - **Secret Sources**: NSS key log files, RSA pre-master decryption, PSK,
//!   session ID and ticket resumption caches
//! - **Record Layer**: RC4, NULL, DES/3DES/AES-CBC (chained and explicit IV,
//!   encrypt-then-MAC), AES-GCM, AES-CCM(-8), ChaCha20-Poly1305
//! - **Post-processing**: per-direction DEFLATE decompression
//! - **Key Export**: master secrets rendered back as key log lines
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tlsdecrypt_core::prelude::*;
//!
//! let caches = Arc::new(SecretCacheSet::new());
//! KeyLog::from_file("sslkeylog.txt").unwrap().load_into(&caches);
//!
//! let mut session = TlsSession::new(caches, DecryptConfig::default());
//! session.process_client_hello(&ClientHello {
//!     random: [0u8; 32],
//!     ..Default::default()
//! });
//! session
//!     .process_server_hello(&ServerHello {
//!         random: [1u8; 32],
//!         cipher_suite: 0xc02f,
//!         version: 0x0303,
//!         ..Default::default()
//!     })
//!     .unwrap();
//! session.change_cipher_spec(Direction::ServerToClient);
//!
//! let record = [0u8; 40];
//! match session.process_record(Direction::ServerToClient, 23, 0x0303, &record) {
//!     Ok(RecordOutcome::Decrypted(plaintext)) => println!("{} bytes", plaintext.data.len()),
//!     Ok(RecordOutcome::Opaque(_)) => println!("no keys"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        tlsdecrypt-core                              |
//! +---------------------------------------------------------------------+
//! |  suites/     - Cipher suite registry                                |
//! |  version/    - Protocol versions and PRF families                   |
//! |  prf/        - Hashes, HMAC, PRFs, HKDF-Expand-Label                |
//! |  keylog/     - Key log parser                                       |
//! |  secrets/    - Secret caches, pre-master handling, resolution       |
//! |  kdf/        - Key block and TLS 1.3 traffic key derivation         |
//! |  decoder/    - Per-direction cipher state                           |
//! |  record/     - Record decryption and authentication                 |
//! |  compress/   - DEFLATE decompression                                |
//! |  session/    - Handshake tracking and key switching                 |
//! |  export/     - Key log export                                       |
//! |  error/      - Error types                                          |
//! +---------------------------------------------------------------------+
//! ```

pub mod compress;
pub mod config;
pub mod decoder;
pub mod error;
pub mod export;
pub mod kdf;
pub mod keylog;
pub mod prelude;
pub mod prf;
pub mod record;
pub mod secrets;
pub mod session;
pub mod suites;
pub mod transcript;
pub mod version;

// Re-export commonly used types at crate root for convenience
pub use compress::Decompressor;
pub use config::{DecryptConfig, Tls13Revision, MAX_PLAINTEXT_LEN};
pub use decoder::Decoder;
pub use error::{ConfigError, DecryptError, Error, PremasterError, Result};
pub use export::{export_key, ExportedKey};
pub use kdf::{
    derive_key_material, derive_tls13_keys, next_traffic_secret, Direction, KeyMaterial,
    Tls13KeyMaterial, TrafficPhase,
};
pub use keylog::{KeyLog, KeyLogEntry, KeyLogError};
pub use prf::HashAlgorithm;
pub use record::{decrypt_record, Plaintext, RecordCodec};
pub use secrets::{
    derive_master_secret, psk_premaster, strip_pkcs1_padding, CacheStats, PremasterDecryptor,
    SecretCacheSet, SecretMaterial, SecretResolver, SecretSource, TrafficSecretKind,
};
pub use session::{ClientHello, RecordOutcome, ServerHello, SessionState, TlsSession};
pub use suites::{BulkCipher, CipherMode, CipherSuiteDescriptor, KeyExchange};
pub use transcript::HandshakeTranscript;
pub use version::ProtocolVersion;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
