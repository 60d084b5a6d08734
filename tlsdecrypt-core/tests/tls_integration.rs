//! TLS decryption integration tests.
//!
//! These tests verify the full decryption pipeline from key log parsing
//! through secret resolution and key derivation to record decryption.
//! Records were produced with an independent implementation.

use std::sync::Arc;

use tlsdecrypt_core::{
    derive_key_material, derive_master_secret, export_key, suites, DecryptConfig, DecryptError,
    Decoder, Direction, HandshakeTranscript, KeyLog, PremasterDecryptor, PremasterError,
    ProtocolVersion, RecordCodec, RecordOutcome, SecretCacheSet, SecretMaterial, SecretSource,
    Tls13Revision, TlsSession, TrafficPhase,
};
use tlsdecrypt_core::session::{ClientHello, ServerHello};

// ============================================================================
// Test Constants
// ============================================================================

const CLIENT_RANDOM: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
const SERVER_RANDOM: &str = "202122232425262728292a2b2c2d2e2f303132333435363738393a3b3c3d3e3f";
const MASTER_SECRET: &str = "404142434445464748494a4b4c4d4e4f505152535455565758595a5b5c5d5e5f606162636465666768696a6b6c6d6e6f";

/// TLS 1.2 pre-master recovered from RSA ClientKeyExchange
const RSA_PREMASTER: &str = "0303808182838485868788898a8b8c8d8e8f909192939495969798999a9b9c9d9e9fa0a1a2a3a4a5a6a7a8a9aaabacad";
const RSA_MASTER: &str = "9ca002fd6dedbf6f24e1dcbacdf12fe03c19c6f3aca1226716d811fce99563a03a00885c61ef030f1fdba19f4f6fed80";

// Cipher suite IDs
const TLS_RSA_WITH_RC4_128_MD5: u16 = 0x0004;
const TLS_RSA_WITH_AES_128_CBC_SHA: u16 = 0x002F;
const TLS_RSA_WITH_AES_128_GCM_SHA256: u16 = 0x009C;
const TLS_PSK_WITH_AES_128_GCM_SHA256: u16 = 0x00A8;
const TLS_CHACHA20_POLY1305_SHA256: u16 = 0x1303;
const TLS_AES_128_CCM_SHA256: u16 = 0x1304;
const TLS_AES_128_CCM_8_SHA256: u16 = 0x1305;
const TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256: u16 = 0xC02B;
const TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256: u16 = 0xC02F;

fn unhex(s: &str) -> Vec<u8> {
    hex::decode(s).expect("valid hex")
}

fn random(s: &str) -> [u8; 32] {
    unhex(s).try_into().expect("32 bytes")
}

fn keylog_caches(content: &str) -> Arc<SecretCacheSet> {
    let keylog = KeyLog::parse(content).expect("Failed to parse keylog");
    let caches = SecretCacheSet::new();
    keylog.load_into(&caches);
    Arc::new(caches)
}

fn handshake(session: &mut TlsSession, cipher_suite: u16, version: u16) {
    session.process_client_hello(&ClientHello {
        random: random(CLIENT_RANDOM),
        ..Default::default()
    });
    session
        .process_server_hello(&ServerHello {
            random: random(SERVER_RANDOM),
            cipher_suite,
            version,
            ..Default::default()
        })
        .expect("valid ServerHello");
}

fn decrypt(session: &mut TlsSession, direction: Direction, version: u16, record: &str) -> Vec<u8> {
    let plaintext = session
        .decrypt_record(direction, 23, version, &unhex(record))
        .expect("record decrypts");
    assert!(plaintext.authenticated);
    plaintext.data
}

/// Private-key stand-in returning a fixed PKCS#1 v1.5 block.
struct FixedRsaBlock(Vec<u8>);

impl PremasterDecryptor for FixedRsaBlock {
    fn rsa_decrypt(&self, _encrypted: &[u8]) -> Result<Vec<u8>, PremasterError> {
        Ok(self.0.clone())
    }
}

fn pkcs1_block(premaster: &[u8]) -> Vec<u8> {
    let mut block = vec![0x00, 0x02];
    block.extend_from_slice(&[0xa7; 77]);
    block.push(0x00);
    block.extend_from_slice(premaster);
    block
}

// ============================================================================
// TLS 1.2 CBC via RSA key exchange
// ============================================================================

const CBC12_RECORD_0: &str = "a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a54cc59bd101236efa947bf8a5ae51fef257051528981e77cce4c152c67068d3629366250f788c0c79c9b991532656af6b07260f878fb2cda84ae3d48f67cb5899";
const CBC12_RECORD_1: &str = "5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5aa371804677fc281efcbb605eb98020e1986acf972313e9117cc9cb742e100fd7931fe6e77ff30bbae4a3763e423fbd57";
const CBC12_BAD_PADDING: &str = "a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a54cc59bd101236efa947bf8a5ae51fef257051528981e77cce4c152c67068d3629366250f788c0c79c9b991532656af6b3de62a8f5fc51599521ef49815bd9884";

fn rsa_session(config: DecryptConfig) -> (TlsSession, Arc<SecretCacheSet>) {
    let caches = Arc::new(SecretCacheSet::new());
    let mut session = TlsSession::new(caches.clone(), config)
        .with_decryptor(Arc::new(FixedRsaBlock(pkcs1_block(&unhex(RSA_PREMASTER)))));
    handshake(&mut session, TLS_RSA_WITH_AES_128_CBC_SHA, 0x0303);
    session
        .process_client_key_exchange(&[0x10, 0x00, 0x00, 0x82], Some(&[0x99; 128]))
        .expect("key exchange");
    session.change_cipher_spec(Direction::ClientToServer);
    (session, caches)
}

#[test]
fn test_rsa_cbc_end_to_end() {
    let (mut session, caches) = rsa_session(DecryptConfig::default());

    assert_eq!(session.master_source(), Some(SecretSource::RsaDecrypt));
    assert_eq!(
        session.master_secret().unwrap().as_bytes(),
        unhex(RSA_MASTER).as_slice()
    );

    let data = decrypt(&mut session, Direction::ClientToServer, 0x0303, CBC12_RECORD_0);
    assert_eq!(data, b"GET / HTTP/1.1\r\nHost: example\r\n\r\n");
    let data = decrypt(&mut session, Direction::ClientToServer, 0x0303, CBC12_RECORD_1);
    assert_eq!(data, b"second record");

    // Decrypted pre-master is cached under the encrypted prefix
    assert!(caches.premaster_by_encrypted(&[0x99; 128]).is_some());
}

#[test]
fn test_rsa_cbc_out_of_order_fails() {
    let (mut session, _) = rsa_session(DecryptConfig::default());
    let err = session
        .decrypt_record(Direction::ClientToServer, 23, 0x0303, &unhex(CBC12_RECORD_1))
        .unwrap_err();
    assert!(matches!(err, DecryptError::AuthenticationFailure { .. }));
}

#[test]
fn test_cbc_bad_padding_is_fatal() {
    let (mut session, _) = rsa_session(DecryptConfig::default().ignoring_auth_failures());
    let err = session
        .decrypt_record(Direction::ClientToServer, 23, 0x0303, &unhex(CBC12_BAD_PADDING))
        .unwrap_err();
    assert_eq!(
        err,
        DecryptError::AuthenticationFailure {
            reason: "bad padding"
        }
    );

    // Padding rejection leaves the sequence number alone
    let decoder = session.decoder(Direction::ClientToServer).unwrap();
    assert_eq!(decoder.seq(), 0);
    let data = decrypt(&mut session, Direction::ClientToServer, 0x0303, CBC12_RECORD_0);
    assert_eq!(data, b"GET / HTTP/1.1\r\nHost: example\r\n\r\n");
}

#[test]
fn test_cbc_mac_failure_ignored() {
    let mut record = unhex(CBC12_RECORD_1);
    // Flip a bit in the first ciphertext block: garbles content, keeps padding
    record[16] ^= 0x01;

    let (mut session, _) = rsa_session(DecryptConfig::default());
    session.decoder_mut(Direction::ClientToServer).unwrap().set_seq(1);
    let plaintext = RecordCodec::new(DecryptConfig::default().ignoring_auth_failures())
        .decrypt_record(
            session.decoder_mut(Direction::ClientToServer).unwrap(),
            23,
            0x0303,
            &record,
        )
        .unwrap();
    assert!(!plaintext.authenticated);
    assert_eq!(plaintext.data.len(), b"second record".len());
}

#[test]
fn test_export_key_after_rsa() {
    let (session, caches) = rsa_session(DecryptConfig::default());
    let exported = export_key(&session).unwrap();
    let line = format!("CLIENT_RANDOM {CLIENT_RANDOM} {RSA_MASTER}");
    assert_eq!(exported.to_keylog_line(), line);
    assert_eq!(caches.exported_keys()[0].to_keylog_line(), line);
}

// ============================================================================
// Encrypt-then-MAC
// ============================================================================

#[test]
fn test_encrypt_then_mac() {
    let mut session = TlsSession::new(Arc::new(SecretCacheSet::new()), DecryptConfig::default());
    session.process_client_hello(&ClientHello {
        random: random(CLIENT_RANDOM),
        encrypt_then_mac: true,
        ..Default::default()
    });
    session
        .process_server_hello(&ServerHello {
            random: random(SERVER_RANDOM),
            cipher_suite: TLS_RSA_WITH_AES_128_CBC_SHA,
            version: 0x0303,
            encrypt_then_mac: true,
            ..Default::default()
        })
        .unwrap();
    session
        .set_pre_master_secret(SecretMaterial::new(unhex(RSA_PREMASTER)))
        .unwrap();
    session.change_cipher_spec(Direction::ClientToServer);
    assert!(session.decoder(Direction::ClientToServer).unwrap().encrypt_then_mac());

    let data = decrypt(
        &mut session,
        Direction::ClientToServer,
        0x0303,
        "a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a57ae9e20e7630f01194b0df04a51c2b8c3fbe767f174b17095ad9a83d833a7c24dc53894d3a167d47059099a7778634be79177f13",
    );
    assert_eq!(data, b"encrypt then mac");
}

// ============================================================================
// TLS 1.0 chained IV and SSLv3
// ============================================================================

#[test]
fn test_tls10_chained_cbc() {
    let caches = keylog_caches(&format!("CLIENT_RANDOM {CLIENT_RANDOM} {MASTER_SECRET}"));
    let mut session = TlsSession::new(caches, DecryptConfig::default());
    handshake(&mut session, TLS_RSA_WITH_AES_128_CBC_SHA, 0x0301);
    session.change_cipher_spec(Direction::ClientToServer);

    let data = decrypt(
        &mut session,
        Direction::ClientToServer,
        0x0301,
        "540353862828aa4704340748d5565acc98e1c8029eb03fbbe4bb343c746540d293f1b52fb5029631df5db801ed218a4b",
    );
    assert_eq!(data, b"first tls10 record");

    let data = decrypt(
        &mut session,
        Direction::ClientToServer,
        0x0301,
        "92a3a88e7bd2c4be09372c8d7515e7cf536533dd0563887da2ac5fd14915524bd27b0129e2d055fa3c9d76d21d3e93a5",
    );
    assert_eq!(data, b"second tls10 record");
}

#[test]
fn test_ssl3_rc4_md5() {
    let premaster = format!("0300{}", (0xc0u8..0xee).map(|b| format!("{b:02x}")).collect::<String>());
    let caches = keylog_caches(&format!("PMS_CLIENT_RANDOM {CLIENT_RANDOM} {premaster}"));
    let mut session = TlsSession::new(caches, DecryptConfig::default());
    handshake(&mut session, TLS_RSA_WITH_RC4_128_MD5, 0x0300);
    session.change_cipher_spec(Direction::ServerToClient);

    assert_eq!(
        session.master_secret().unwrap().as_bytes(),
        unhex("6a20e0b30fc2792f4242829fee11b010ab4044215e7c59319884cf6a6b55acbc77d3df32c140758a26c5643347b943ec").as_slice()
    );

    let data = decrypt(
        &mut session,
        Direction::ServerToClient,
        0x0300,
        "fea035e200fc14ac57e3af8fb618f69ee22f2af0dad64eacea5ee7630533e451b4",
    );
    assert_eq!(data, b"HTTP/1.0 200 OK\r\n");
    let data = decrypt(
        &mut session,
        Direction::ServerToClient,
        0x0300,
        "50298c2619ba9faacbede262a455d9343da1bab0",
    );
    assert_eq!(data, b"body");
}

// ============================================================================
// TLS 1.2 AEAD
// ============================================================================

#[test]
fn test_tls12_key_block_known_answer() {
    let suite = suites::require(TLS_RSA_WITH_AES_128_GCM_SHA256).unwrap();
    let keys = derive_key_material(
        ProtocolVersion::Tls12,
        suite,
        &SecretMaterial::new(unhex(MASTER_SECRET)),
        &random(CLIENT_RANDOM),
        &random(SERVER_RANDOM),
    )
    .unwrap();
    assert_eq!(keys.client_key, unhex("f32875e0a2d0d4cdb7085fc48be6ac3d"));
    assert_eq!(keys.server_key, unhex("3bbb753b2b859331a3bf156c51b814bc"));
    assert_eq!(keys.client_iv, unhex("cb728357"));
    assert_eq!(keys.server_iv, unhex("7e043d44"));
}

#[test]
fn test_deflate_records() {
    let caches = keylog_caches(&format!("CLIENT_RANDOM {CLIENT_RANDOM} {MASTER_SECRET}"));
    let mut session = TlsSession::new(caches, DecryptConfig::default());
    session.process_client_hello(&ClientHello {
        random: random(CLIENT_RANDOM),
        ..Default::default()
    });
    session
        .process_server_hello(&ServerHello {
            random: random(SERVER_RANDOM),
            cipher_suite: TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
            version: 0x0303,
            compression: 1,
            ..Default::default()
        })
        .unwrap();
    session.change_cipher_spec(Direction::ClientToServer);

    let data = decrypt(
        &mut session,
        Direction::ClientToServer,
        0x0303,
        "0000000000000000b581cb5ac19ef68d40043d55ce8e4a10ff550f7e3281df1c813c552a15a20ee2e1221aea5c4d4cd9729a104602c9f632fa6a74",
    );
    assert_eq!(data, b"compressed payload one, compressed payload one");
    let data = decrypt(
        &mut session,
        Direction::ClientToServer,
        0x0303,
        "0000000000000001881f1e72586dd7c76dcd556b47aa6b93a25a6ad1ff254776f02fb1",
    );
    assert_eq!(data, b"compressed payload two");
}

#[test]
fn test_psk_key_exchange() {
    let config = DecryptConfig::default().with_psk(b"secretpsk".to_vec());
    let mut session = TlsSession::new(Arc::new(SecretCacheSet::new()), config);
    handshake(&mut session, TLS_PSK_WITH_AES_128_GCM_SHA256, 0x0303);
    session.change_cipher_spec(Direction::ClientToServer);

    assert_eq!(session.master_source(), Some(SecretSource::Psk));
    let data = decrypt(
        &mut session,
        Direction::ClientToServer,
        0x0303,
        "00000000000000003bcd1ad90c7eb06d38374e24e730d5370126a20983d6265f5ed4a6462f",
    );
    assert_eq!(data, b"psk protected");
}

#[test]
fn test_extended_master_secret() {
    let mut transcript = HandshakeTranscript::new();
    transcript.update(b"\x01\x00\x00\x04abcd");
    transcript.update(b"\x02\x00\x00\x04efgh");

    let suite = suites::require(TLS_RSA_WITH_AES_128_GCM_SHA256).unwrap();
    let premaster = format!("0303{}", (0x10u8..0x3e).map(|b| format!("{b:02x}")).collect::<String>());
    let session_hash = transcript
        .session_hash(ProtocolVersion::Tls12, suite.digest)
        .unwrap();

    let master = derive_master_secret(
        ProtocolVersion::Tls12,
        suite,
        &SecretMaterial::new(unhex(&premaster)),
        &random(CLIENT_RANDOM),
        &random(SERVER_RANDOM),
        Some(session_hash.as_slice()),
    )
    .unwrap();
    assert_eq!(
        master.as_bytes(),
        unhex("647fe239c5194f31d9b410e8c324d77b8b296a9b10da0343ce88bcbd9c5561fea7c48c9292c1420c70e9dd3a66440df1").as_slice()
    );
}

// ============================================================================
// Session ticket resumption
// ============================================================================

#[test]
fn test_resume_with_issued_ticket() {
    let caches = keylog_caches(&format!("CLIENT_RANDOM {CLIENT_RANDOM} {MASTER_SECRET}"));

    // Full handshake; the server hands out a ticket afterwards
    let mut first = TlsSession::new(caches.clone(), DecryptConfig::default());
    handshake(&mut first, TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256, 0x0303);
    assert_eq!(first.master_source(), Some(SecretSource::ClientRandom));
    first.process_new_session_ticket(b"TICKET-T");

    // Second connection resumes with it under fresh randoms
    let session_id = vec![0x5e; 32];
    let mut second = TlsSession::new(caches.clone(), DecryptConfig::default());
    second.process_client_hello(&ClientHello {
        random: std::array::from_fn(|i| 0x80 + i as u8),
        session_id: session_id.clone(),
        session_ticket: b"TICKET-T".to_vec(),
        ..Default::default()
    });
    second
        .process_server_hello(&ServerHello {
            random: std::array::from_fn(|i| 0xa0 + i as u8),
            session_id,
            cipher_suite: TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
            version: 0x0303,
            ..Default::default()
        })
        .unwrap();

    assert!(second.is_resumed());
    assert_eq!(second.master_source(), Some(SecretSource::Ticket));
    assert_eq!(
        second.master_secret().map(|m| m.as_bytes().to_vec()),
        Some(unhex(MASTER_SECRET))
    );

    second.change_cipher_spec(Direction::ServerToClient);
    let data = decrypt(
        &mut second,
        Direction::ServerToClient,
        0x0303,
        "0000000000000000c3f4d33277cf001c7f689635cf0b0f6c99ee9bbc22c37ba40865edbff38b8ea11e913c",
    );
    assert_eq!(data, b"resumed with ticket");
}

// ============================================================================
// DTLS
// ============================================================================

#[test]
fn test_dtls12_gcm() {
    let version = ProtocolVersion::Dtls12;
    let suite = suites::require(TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256).unwrap();
    let keys = derive_key_material(
        version,
        suite,
        &SecretMaterial::new(unhex(MASTER_SECRET)),
        &random(CLIENT_RANDOM),
        &random(SERVER_RANDOM),
    )
    .unwrap();
    let mut decoder =
        Decoder::from_key_material(version, suite, &keys, Direction::ClientToServer, false)
            .unwrap();

    let record = unhex(
        "000100000000000594d6edbc005f06802195995c02e906ca6a04ec77f791586bf9e0aa32c8",
    );
    let plaintext = RecordCodec::default()
        .decrypt_dtls_record(&mut decoder, 23, 0xfefd, 1, 5, &record)
        .unwrap();
    assert_eq!(plaintext.data, b"dtls datagram");
    assert_eq!(decoder.epoch(), 1);
    assert_eq!(decoder.seq(), 6);

    // Wrong epoch changes the AAD
    let err = RecordCodec::default()
        .decrypt_dtls_record(&mut decoder, 23, 0xfefd, 2, 5, &record)
        .unwrap_err();
    assert!(matches!(err, DecryptError::AuthenticationFailure { .. }));
}

// ============================================================================
// TLS 1.3
// ============================================================================

#[test]
fn test_tls13_application_data_and_key_update() {
    let secret: String = (0x90u8..0xb0).map(|b| format!("{b:02x}")).collect();
    let caches = keylog_caches(&format!("SERVER_TRAFFIC_SECRET_0 {CLIENT_RANDOM} {secret}"));
    let mut session = TlsSession::new(caches, DecryptConfig::default());
    handshake(&mut session, TLS_CHACHA20_POLY1305_SHA256, 0x0304);

    // No handshake secrets: handshake records pass through
    let outcome = session
        .process_record(Direction::ServerToClient, 23, 0x0303, b"encrypted handshake")
        .unwrap();
    assert!(matches!(outcome, RecordOutcome::Opaque(_)));

    session.mark_finished(Direction::ServerToClient).unwrap();
    let plaintext = session
        .decrypt_record(
            Direction::ServerToClient,
            23,
            0x0303,
            &unhex("0de29c4f698b93db986ceaad51a7cf680ef5d1eabec53405240e7cba067d03"),
        )
        .unwrap();
    assert_eq!(plaintext.content_type, 0x17);
    assert_eq!(plaintext.data, b"hello tls13");

    session.key_update(Direction::ServerToClient).unwrap();
    let plaintext = session
        .decrypt_record(
            Direction::ServerToClient,
            23,
            0x0303,
            &unhex("132f136a5903bb4d24e371fd4be06507bb3295f6d02ffca96b4b17e71c"),
        )
        .unwrap();
    assert_eq!(plaintext.data, b"after update");
}

/// Client Finished under TLS_AES_128_CCM_SHA256 handshake keys, sequence 1
const TLS13_CCM_FINISHED: &str = "fbab6a3bd44f1fef0dd020ecf9403c70c6ae7ccb2337566f752cf5bf35ea6c1c7b8061beebb4cb3994a3f3369e3705114c2909bfc1";

#[test]
fn test_tls13_ccm_handshake_record() {
    let secret: String = (0xd0u8..0xf0).map(|b| format!("{b:02x}")).collect();
    let caches = keylog_caches(&format!(
        "CLIENT_HANDSHAKE_TRAFFIC_SECRET {CLIENT_RANDOM} {secret}"
    ));
    let mut session = TlsSession::new(caches, DecryptConfig::default());
    handshake(&mut session, TLS_AES_128_CCM_SHA256, 0x0304);

    let decoder = session.decoder_mut(Direction::ClientToServer).unwrap();
    decoder.set_seq(1);

    let plaintext = session
        .decrypt_record(
            Direction::ClientToServer,
            23,
            0x0303,
            &unhex(TLS13_CCM_FINISHED),
        )
        .unwrap();
    assert_eq!(plaintext.content_type, 0x16);
    let mut expected = vec![0x14, 0x00, 0x00, 0x20];
    expected.extend_from_slice(&[0u8; 32]);
    assert_eq!(plaintext.data, expected);
}

#[test]
fn test_tls13_draft_revision() {
    let secret: String = (0x90u8..0xb0).map(|b| format!("{b:02x}")).collect();
    let caches = keylog_caches(&format!("SERVER_TRAFFIC_SECRET_0 {CLIENT_RANDOM} {secret}"));
    let config = DecryptConfig::default().with_tls13_revision(Tls13Revision::Draft);
    let mut session = TlsSession::new(caches, config);
    handshake(&mut session, TLS_CHACHA20_POLY1305_SHA256, 0x0304);
    session.mark_finished(Direction::ServerToClient).unwrap();

    // Sealed without AAD
    let data = decrypt(
        &mut session,
        Direction::ServerToClient,
        0x0303,
        "01f59145728b95d28832abde46e613d017cde20df42758cbe5478e1346",
    );
    assert_eq!(data, b"draft record");

    // Ratchet with the draft label
    session.key_update(Direction::ServerToClient).unwrap();
    let data = decrypt(
        &mut session,
        Direction::ServerToClient,
        0x0303,
        "7e8afc130dd604890606aecc4300ef79263d891ee186d08471c217a8c2",
    );
    assert_eq!(data, b"draft update");
}

#[test]
fn test_tls13_final_revision_rejects_draft_record() {
    let secret: String = (0x90u8..0xb0).map(|b| format!("{b:02x}")).collect();
    let caches = keylog_caches(&format!("SERVER_TRAFFIC_SECRET_0 {CLIENT_RANDOM} {secret}"));
    let mut session = TlsSession::new(caches, DecryptConfig::default());
    handshake(&mut session, TLS_CHACHA20_POLY1305_SHA256, 0x0304);
    session.mark_finished(Direction::ServerToClient).unwrap();

    let err = session
        .decrypt_record(
            Direction::ServerToClient,
            23,
            0x0303,
            &unhex("01f59145728b95d28832abde46e613d017cde20df42758cbe5478e1346"),
        )
        .unwrap_err();
    assert!(matches!(err, DecryptError::AuthenticationFailure { .. }));
}

#[test]
fn test_tls13_early_data_rejected() {
    let secret: String = (0xd0u8..0xf0).map(|b| format!("{b:02x}")).collect();
    let caches = keylog_caches(&format!(
        "CLIENT_HANDSHAKE_TRAFFIC_SECRET {CLIENT_RANDOM} {secret}"
    ));
    let mut session = TlsSession::new(caches, DecryptConfig::default());
    session.process_client_hello(&ClientHello {
        random: random(CLIENT_RANDOM),
        early_data: true,
        early_data_suite: Some(TLS_AES_128_CCM_SHA256),
        ..Default::default()
    });
    session
        .process_server_hello(&ServerHello {
            random: random(SERVER_RANDOM),
            cipher_suite: TLS_AES_128_CCM_SHA256,
            version: 0x0304,
            ..Default::default()
        })
        .unwrap();

    // Waiting for early data keys that will never be used
    assert_eq!(session.phase(Direction::ClientToServer), Some(TrafficPhase::Early));
    assert!(session.decoder(Direction::ClientToServer).is_none());

    session.process_encrypted_extensions(false).unwrap();
    assert_eq!(
        session.phase(Direction::ClientToServer),
        Some(TrafficPhase::Handshake)
    );

    session
        .decoder_mut(Direction::ClientToServer)
        .unwrap()
        .set_seq(1);
    let plaintext = session
        .decrypt_record(
            Direction::ClientToServer,
            23,
            0x0303,
            &unhex(TLS13_CCM_FINISHED),
        )
        .unwrap();
    assert_eq!(plaintext.content_type, 0x16);
    assert_eq!(&plaintext.data[..4], &[0x14, 0x00, 0x00, 0x20]);
}

// ============================================================================
// Ignoring authentication failures
// ============================================================================

fn tampered_tag(record: &str) -> Vec<u8> {
    let mut record = unhex(record);
    let last = record.len() - 1;
    record[last] ^= 0x40;
    record
}

#[test]
fn test_tls13_chacha_ignore_auth_failures() {
    let secret: String = (0x90u8..0xb0).map(|b| format!("{b:02x}")).collect();
    let caches = keylog_caches(&format!("SERVER_TRAFFIC_SECRET_0 {CLIENT_RANDOM} {secret}"));
    let mut session = TlsSession::new(caches, DecryptConfig::default().ignoring_auth_failures());
    handshake(&mut session, TLS_CHACHA20_POLY1305_SHA256, 0x0304);
    session.mark_finished(Direction::ServerToClient).unwrap();

    let plaintext = session
        .decrypt_record(
            Direction::ServerToClient,
            23,
            0x0303,
            &tampered_tag("0de29c4f698b93db986ceaad51a7cf680ef5d1eabec53405240e7cba067d03"),
        )
        .unwrap();
    assert!(!plaintext.authenticated);
    assert_eq!(plaintext.content_type, 0x17);
    assert_eq!(plaintext.data, b"hello tls13");
}

#[test]
fn test_tls13_ccm_ignore_auth_failures() {
    let secret: String = (0xd0u8..0xf0).map(|b| format!("{b:02x}")).collect();
    let caches = keylog_caches(&format!(
        "CLIENT_HANDSHAKE_TRAFFIC_SECRET {CLIENT_RANDOM} {secret}"
    ));
    let mut session = TlsSession::new(caches, DecryptConfig::default().ignoring_auth_failures());
    handshake(&mut session, TLS_AES_128_CCM_SHA256, 0x0304);
    session
        .decoder_mut(Direction::ClientToServer)
        .unwrap()
        .set_seq(1);

    let plaintext = session
        .decrypt_record(
            Direction::ClientToServer,
            23,
            0x0303,
            &tampered_tag(TLS13_CCM_FINISHED),
        )
        .unwrap();
    assert!(!plaintext.authenticated);
    assert_eq!(plaintext.content_type, 0x16);
    let mut expected = vec![0x14, 0x00, 0x00, 0x20];
    expected.extend_from_slice(&[0u8; 32]);
    assert_eq!(plaintext.data, expected);
}

#[test]
fn test_tls13_ccm8_ignore_auth_failures() {
    let suite = suites::require(TLS_AES_128_CCM_8_SHA256).unwrap();
    let secret = SecretMaterial::new((0xd0u8..0xf0).collect());
    let record = "acebeac03cb74613f0d10ead4894c18b88bd";

    let mut strict = Decoder::tls13(suite, &secret, TrafficPhase::Application).unwrap();
    let plaintext = RecordCodec::default()
        .decrypt_record(&mut strict, 23, 0x0303, &unhex(record))
        .unwrap();
    assert!(plaintext.authenticated);
    assert_eq!(plaintext.data, b"ccm8 data");

    let codec = RecordCodec::new(DecryptConfig::default().ignoring_auth_failures());
    let mut lenient = Decoder::tls13(suite, &secret, TrafficPhase::Application).unwrap();
    let plaintext = codec
        .decrypt_record(&mut lenient, 23, 0x0303, &tampered_tag(record))
        .unwrap();
    assert!(!plaintext.authenticated);
    assert_eq!(plaintext.content_type, 0x17);
    assert_eq!(plaintext.data, b"ccm8 data");
    assert_eq!(lenient.seq(), 1);
}
