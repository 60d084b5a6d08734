//! Fuzz target for record decryption.
//!
//! Decrypts arbitrary fragments with fixed keys across the record
//! protection modes:
//! - RC4 and NULL stream records (SSLv3 and TLS MACs)
//! - CBC with chained and explicit IVs, MAC-then-encrypt and encrypt-then-MAC
//! - AES-GCM, AES-CCM(-8) and ChaCha20-Poly1305 (TLS 1.2, DTLS 1.2, TLS 1.3)
//!
//! Both strict and ignore modes run, so garbage plaintext also reaches
//! padding removal and decompression.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tlsdecrypt_core::{
    suites, DecryptConfig, Decoder, ProtocolVersion, RecordCodec, SecretMaterial, TrafficPhase,
};

/// (suite, version) pairs selected by the first input byte.
const TARGETS: &[(u16, ProtocolVersion)] = &[
    (0x0004, ProtocolVersion::Ssl30),
    (0x0002, ProtocolVersion::Tls10),
    (0x000a, ProtocolVersion::Tls10),
    (0x002f, ProtocolVersion::Tls11),
    (0x003c, ProtocolVersion::Tls12),
    (0x009c, ProtocolVersion::Tls12),
    (0xc0ac, ProtocolVersion::Tls12),
    (0xcca8, ProtocolVersion::Tls12),
    (0xc02b, ProtocolVersion::Dtls12),
    (0x1301, ProtocolVersion::Tls13),
    (0x1303, ProtocolVersion::Tls13),
    (0x1305, ProtocolVersion::Tls13),
];

fn decoder(index: usize, flags: u8) -> Option<Decoder> {
    let (id, version) = TARGETS[index % TARGETS.len()];
    let suite = suites::lookup(id)?;
    if version.is_tls13() {
        let secret = SecretMaterial::new(vec![0x42; suite.digest.output_len()]);
        return Decoder::tls13(suite, &secret, TrafficPhase::Application).ok();
    }

    let key = vec![0x11; suite.key_len()];
    let iv = vec![0x22; suite.iv_len()];
    let mac = vec![0x33; suite.mac_len()];
    let mut decoder = Decoder::new(version, suite, &key, &iv, &mac, flags & 1 != 0).ok()?;
    decoder.set_encrypt_then_mac(flags & 2 != 0);
    Some(decoder)
}

fuzz_target!(|data: &[u8]| {
    let [selector, flags, content_type, rest @ ..] = data else {
        return;
    };

    for config in [
        DecryptConfig::default(),
        DecryptConfig::default().ignoring_auth_failures(),
    ] {
        let Some(mut decoder) = decoder(*selector as usize, *flags) else {
            return;
        };
        let codec = RecordCodec::new(config);
        let record_version = decoder.version().record_version();

        // Several records in a row exercise sequence numbers and IV chaining
        for fragment in rest.chunks(256) {
            let result = if decoder.version().is_dtls() {
                codec.decrypt_dtls_record(&mut decoder, *content_type, record_version, 1, 0, fragment)
            } else {
                codec.decrypt_record(&mut decoder, *content_type, record_version, fragment)
            };
            if let Ok(plaintext) = result {
                assert!(plaintext.data.len() <= fragment.len() + codec.config().max_decompressed_len);
            }
        }
    }
});
