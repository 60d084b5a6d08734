//! TLS session state management.
//!
//! Manages the lifecycle of a TLS session from handshake through decryption,
//! coordinating secret resolution, key derivation and the per-direction
//! decoders.
//!
//! Pre-TLS 1.3 keys are derived as soon as the master secret can be found and
//! stay *pending* until the direction's ChangeCipherSpec. TLS 1.3 handshake
//! keys are active right after ServerHello; each direction moves to
//! application keys at its Finished and ratchets on Key Update.

use std::sync::Arc;

use tracing::debug;

use crate::compress::COMPRESSION_DEFLATE;
use crate::config::DecryptConfig;
use crate::decoder::Decoder;
use crate::error::{ConfigError, DecryptError};
use crate::kdf::{self, Direction, TrafficPhase};
use crate::record::{Plaintext, RecordCodec};
use crate::secrets::{
    PremasterDecryptor, ResolveRequest, SecretCacheSet, SecretMaterial, SecretResolver,
    SecretSource,
};
use crate::suites::{self, CipherSuiteDescriptor};
use crate::transcript::HandshakeTranscript;
use crate::version::ProtocolVersion;

/// How far the session has progressed towards usable keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// Nothing known yet
    NoKeys,
    /// ClientHello seen
    ClientRandomKnown,
    /// ServerHello random seen
    ServerRandomKnown,
    /// Cipher suite negotiated
    CipherKnown,
    /// Protocol version negotiated
    VersionKnown,
    /// Decoders exist for at least one direction
    KeysMaterialized,
}

/// Fields of a ClientHello relevant to decryption.
#[derive(Debug, Clone, Default)]
pub struct ClientHello {
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    /// SessionTicket extension contents
    pub session_ticket: Vec<u8>,
    pub extended_master_secret: bool,
    pub encrypt_then_mac: bool,
    /// TLS 1.3 `early_data` extension present
    pub early_data: bool,
    /// Suite of the PSK offered for early data, when known
    pub early_data_suite: Option<u16>,
    /// Complete handshake message including its header, for the session hash
    pub message: Vec<u8>,
}

/// Fields of a ServerHello relevant to decryption.
#[derive(Debug, Clone, Default)]
pub struct ServerHello {
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suite: u16,
    /// Negotiated version (from `supported_versions` for TLS 1.3)
    pub version: u16,
    pub compression: u8,
    pub extended_master_secret: bool,
    pub encrypt_then_mac: bool,
    /// Complete handshake message including its header, for the session hash
    pub message: Vec<u8>,
}

/// Result of feeding a record through [`TlsSession::process_record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Decrypted(Plaintext),
    /// No keys for this direction; payload returned unchanged
    Opaque(Vec<u8>),
}

#[derive(Debug, Default)]
struct DirectionState {
    active: Option<Decoder>,
    pending: Option<Decoder>,
    phase: Option<TrafficPhase>,
}

/// A TLS or DTLS session that can decrypt traffic.
///
/// Manages the full lifecycle:
/// 1. Collect handshake data (randoms, suite, version, extensions)
/// 2. Resolve the master secret (or TLS 1.3 traffic secrets)
/// 3. Derive keys and build decoders for both directions
/// 4. Switch decoders at ChangeCipherSpec, Finished and Key Update
/// 5. Decrypt records
pub struct TlsSession {
    caches: Arc<SecretCacheSet>,
    codec: RecordCodec,
    decryptor: Option<Arc<dyn PremasterDecryptor>>,

    // Client-origin state
    client_random: Option<[u8; 32]>,
    client_session_id: Vec<u8>,
    session_ticket: Vec<u8>,
    client_ems: bool,
    client_etm: bool,
    early_data: bool,
    early_data_suite: Option<u16>,
    premaster: Option<SecretMaterial>,
    encrypted_premaster: Option<Vec<u8>>,
    key_exchange_seen: bool,
    transcript: HandshakeTranscript,

    // Server-origin state
    server_random: Option<[u8; 32]>,
    session_id: Vec<u8>,
    suite: Option<&'static CipherSuiteDescriptor>,
    version: Option<ProtocolVersion>,
    compression: u8,
    resumed: bool,
    server_ems: bool,
    server_etm: bool,

    master: Option<SecretMaterial>,
    master_source: Option<SecretSource>,
    /// NewSessionTicket seen before the master secret was known
    issued_ticket: Option<Vec<u8>>,

    client: DirectionState,
    server: DirectionState,
}

impl TlsSession {
    /// Create a session sharing `caches` with other sessions.
    pub fn new(caches: Arc<SecretCacheSet>, config: DecryptConfig) -> Self {
        Self {
            caches,
            codec: RecordCodec::new(config),
            decryptor: None,
            client_random: None,
            client_session_id: Vec::new(),
            session_ticket: Vec::new(),
            client_ems: false,
            client_etm: false,
            early_data: false,
            early_data_suite: None,
            premaster: None,
            encrypted_premaster: None,
            key_exchange_seen: false,
            transcript: HandshakeTranscript::new(),
            server_random: None,
            session_id: Vec::new(),
            suite: None,
            version: None,
            compression: 0,
            resumed: false,
            server_ems: false,
            server_etm: false,
            master: None,
            master_source: None,
            issued_ticket: None,
            client: DirectionState::default(),
            server: DirectionState::default(),
        }
    }

    /// Attach the private-key operation used for RSA key exchange.
    pub fn with_decryptor(mut self, decryptor: Arc<dyn PremasterDecryptor>) -> Self {
        self.decryptor = Some(decryptor);
        self
    }

    // ========================================================================
    // Handshake input
    // ========================================================================

    /// Process a ClientHello.
    ///
    /// A ClientHello after keys exist starts a renegotiation: client-origin
    /// state is cleared, active decoders stay until the next ChangeCipherSpec.
    pub fn process_client_hello(&mut self, hello: &ClientHello) {
        if self.client_random.is_some() {
            debug!("ClientHello on established session, resetting client state");
        }

        self.client_random = Some(hello.random);
        self.client_session_id = hello.session_id.clone();
        self.session_ticket = hello.session_ticket.clone();
        self.client_ems = hello.extended_master_secret;
        self.client_etm = hello.encrypt_then_mac;
        self.early_data = hello.early_data;
        self.early_data_suite = hello.early_data_suite;
        self.premaster = None;
        self.encrypted_premaster = None;
        self.key_exchange_seen = false;
        self.master = None;
        self.master_source = None;
        self.issued_ticket = None;
        self.client.pending = None;
        self.server.pending = None;

        self.transcript.clear();
        self.transcript.update(&hello.message);

        if self.early_data {
            if let Some(suite) = self.early_data_suite.and_then(suites::lookup) {
                if suite.is_tls13() {
                    self.install_early_decoder(suite);
                }
            }
        }
    }

    /// Process a ServerHello.
    ///
    /// Fails with [`ConfigError`] when the suite is unknown or cannot be used
    /// with the version. Missing secrets are not an error here; records stay
    /// opaque until keys show up.
    pub fn process_server_hello(&mut self, hello: &ServerHello) -> Result<(), DecryptError> {
        let suite = suites::require(hello.cipher_suite)?;
        let version = ProtocolVersion::from_wire(hello.version)
            .ok_or(ConfigError::UnsupportedVersion(hello.version))?;
        suite.check_version(version)?;

        if self.server_random.is_some() {
            debug!("ServerHello on established session, resetting server state");
            self.client.pending = None;
            self.server.pending = None;
        }

        self.server_random = Some(hello.random);
        self.resumed = !hello.session_id.is_empty() && hello.session_id == self.client_session_id;
        self.session_id = hello.session_id.clone();
        self.suite = Some(suite);
        self.version = Some(version);
        self.compression = hello.compression;
        self.server_ems = hello.extended_master_secret;
        self.server_etm = hello.encrypt_then_mac;
        self.transcript.update(&hello.message);

        debug!(
            suite = suite.name,
            %version,
            resumed = self.resumed,
            "negotiated session parameters"
        );

        match self.try_establish_keys() {
            Ok(_) | Err(DecryptError::KeyMaterialMissing) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Append a handshake message (header included) to the transcript.
    pub fn add_handshake_message(&mut self, message: &[u8]) {
        self.transcript.update(message);
    }

    /// Process a ClientKeyExchange.
    ///
    /// `encrypted_premaster` is the RSA-encrypted pre-master for RSA key
    /// exchange (without the TLS length prefix).
    pub fn process_client_key_exchange(
        &mut self,
        message: &[u8],
        encrypted_premaster: Option<&[u8]>,
    ) -> Result<(), DecryptError> {
        self.transcript.update(message);
        self.key_exchange_seen = true;
        if let Some(encrypted) = encrypted_premaster {
            self.encrypted_premaster = Some(encrypted.to_vec());
        }

        match self.try_establish_keys() {
            Ok(_) | Err(DecryptError::KeyMaterialMissing) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Process a NewSessionTicket issued by the server.
    ///
    /// The ticket is cached against this session's master secret so a later
    /// connection resuming with it can be decrypted. TLS 1.3 tickets carry
    /// no master secret and are ignored.
    pub fn process_new_session_ticket(&mut self, ticket: &[u8]) {
        if ticket.is_empty() || self.version.is_some_and(|v| v.is_tls13()) {
            return;
        }
        match &self.master {
            Some(master) => {
                self.caches.insert_ticket_master(ticket, master.clone());
                debug!(len = ticket.len(), "cached master secret for issued ticket");
            }
            None => self.issued_ticket = Some(ticket.to_vec()),
        }
    }

    /// Process the TLS 1.3 EncryptedExtensions.
    ///
    /// When early data was offered but not accepted the client goes straight
    /// to handshake keys, since no EndOfEarlyData will follow.
    pub fn process_encrypted_extensions(
        &mut self,
        early_data_accepted: bool,
    ) -> Result<(), DecryptError> {
        if early_data_accepted || self.client.phase != Some(TrafficPhase::Early) {
            return Ok(());
        }
        debug!("early data rejected, client moves to handshake keys");
        match self.switch_tls13_phase(Direction::ClientToServer, TrafficPhase::Handshake) {
            Ok(()) | Err(DecryptError::KeyMaterialMissing) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Supply the pre-master secret directly.
    pub fn set_pre_master_secret(&mut self, premaster: SecretMaterial) -> Result<(), DecryptError> {
        self.premaster = Some(premaster);
        self.master = None;
        match self.try_establish_keys() {
            Ok(_) | Err(DecryptError::KeyMaterialMissing) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Derive keys if everything needed is known.
    ///
    /// Returns `Ok(false)` while handshake parameters are missing and
    /// [`DecryptError::KeyMaterialMissing`] when no secret can be found.
    pub fn try_establish_keys(&mut self) -> Result<bool, DecryptError> {
        let (Some(client_random), Some(server_random), Some(suite), Some(version)) =
            (self.client_random, self.server_random, self.suite, self.version)
        else {
            return Ok(false);
        };

        if version.is_tls13() {
            return self.establish_tls13(&client_random, suite);
        }
        if self.master.is_some() {
            return Ok(true);
        }

        let ems = self.extended_master_secret();
        if ems && !self.key_exchange_seen && !self.resumed {
            // Session hash needs the transcript up to ClientKeyExchange
            return Ok(false);
        }
        let session_hash = if ems {
            self.transcript.session_hash(version, suite.digest)
        } else {
            None
        };

        let config = self.codec.config();
        let resolver = SecretResolver::new(&self.caches)
            .with_psk(config.psk.as_deref())
            .with_decryptor(self.decryptor.as_deref());
        let resolved = resolver.resolve(&ResolveRequest {
            version,
            suite,
            client_random: &client_random,
            server_random: &server_random,
            session_id: &self.session_id,
            session_ticket: &self.session_ticket,
            resumed: self.resumed,
            premaster: self.premaster.as_ref(),
            encrypted_premaster: self.encrypted_premaster.as_deref(),
            session_hash: session_hash.as_deref(),
        })?;
        resolver.remember(
            &client_random,
            &self.session_id,
            &self.session_ticket,
            &resolved.secret,
        );
        if let Some(ticket) = self.issued_ticket.take() {
            self.caches.insert_ticket_master(&ticket, resolved.secret.clone());
        }

        let keys = kdf::derive_key_material(
            version,
            suite,
            &resolved.secret,
            &client_random,
            &server_random,
        )?;
        let deflate = self.compression == COMPRESSION_DEFLATE && config.decompress;
        let etm = self.client_etm && self.server_etm;
        for direction in [Direction::ClientToServer, Direction::ServerToClient] {
            let mut decoder =
                Decoder::from_key_material(version, suite, &keys, direction, deflate)?;
            decoder.set_encrypt_then_mac(etm);
            self.direction_mut(direction).pending = Some(decoder);
        }

        debug!(
            source = ?resolved.source,
            suite = suite.name,
            extended_master_secret = ems,
            "session keys derived"
        );
        self.master = Some(resolved.secret);
        self.master_source = Some(resolved.source);
        Ok(true)
    }

    fn establish_tls13(
        &mut self,
        client_random: &[u8; 32],
        suite: &'static CipherSuiteDescriptor,
    ) -> Result<bool, DecryptError> {
        if self.server.phase.is_none() {
            self.server.phase = Some(TrafficPhase::Handshake);
        }
        if self.client.phase.is_none() {
            self.client.phase = Some(if self.early_data {
                TrafficPhase::Early
            } else {
                TrafficPhase::Handshake
            });
        }

        for direction in [Direction::ClientToServer, Direction::ServerToClient] {
            let state = self.direction(direction);
            if state.active.is_some() {
                continue;
            }
            let Some(phase) = state.phase else { continue };
            if let Some(decoder) = self.tls13_decoder(client_random, suite, phase, direction)? {
                self.direction_mut(direction).active = Some(decoder);
            }
        }

        if self.client.active.is_none() && self.server.active.is_none() {
            return Err(DecryptError::KeyMaterialMissing);
        }
        Ok(true)
    }

    fn tls13_decoder(
        &self,
        client_random: &[u8; 32],
        suite: &'static CipherSuiteDescriptor,
        phase: TrafficPhase,
        direction: Direction,
    ) -> Result<Option<Decoder>, ConfigError> {
        let Some(kind) = phase.secret_kind(direction) else {
            return Ok(None);
        };
        let Some(secret) = self.caches.traffic_secret(client_random, kind) else {
            debug!(?kind, "no TLS 1.3 traffic secret");
            return Ok(None);
        };
        let decoder = Decoder::tls13(suite, &secret, phase)?;
        debug!(?phase, %direction, suite = suite.name, "installed TLS 1.3 decoder");
        Ok(Some(decoder))
    }

    fn install_early_decoder(&mut self, suite: &'static CipherSuiteDescriptor) {
        self.client.phase = Some(TrafficPhase::Early);
        let Some(client_random) = self.client_random else {
            return;
        };
        let early = TrafficPhase::Early;
        match self.tls13_decoder(&client_random, suite, early, Direction::ClientToServer) {
            Ok(decoder) => self.client.active = decoder,
            Err(e) => debug!("early data keys unavailable: {e}"),
        }
    }

    // ========================================================================
    // Key changes
    // ========================================================================

    /// Activate the pending keys of `direction`.
    ///
    /// Without pending keys the direction becomes opaque. TLS 1.3
    /// compatibility ChangeCipherSpec records are ignored.
    pub fn change_cipher_spec(&mut self, direction: Direction) {
        if self.version.is_some_and(|v| v.is_tls13()) {
            return;
        }
        let state = self.direction_mut(direction);
        let next_epoch = state.active.as_ref().map_or(1, |d| d.epoch().wrapping_add(1));
        state.active = state.pending.take().map(|mut decoder| {
            if decoder.version().is_dtls() {
                decoder.set_epoch(next_epoch);
            }
            decoder
        });
        debug!(%direction, keyed = state.active.is_some(), "change cipher spec");
    }

    /// Client sent EndOfEarlyData; switch it to handshake keys.
    pub fn end_of_early_data(&mut self) -> Result<(), DecryptError> {
        self.switch_tls13_phase(Direction::ClientToServer, TrafficPhase::Handshake)
    }

    /// `direction` sent its Finished message.
    ///
    /// TLS 1.3 switches that direction to application traffic keys; earlier
    /// versions are unaffected.
    pub fn mark_finished(&mut self, direction: Direction) -> Result<(), DecryptError> {
        if !self.version.is_some_and(|v| v.is_tls13()) {
            return Ok(());
        }
        self.switch_tls13_phase(direction, TrafficPhase::Application)
    }

    /// Apply a TLS 1.3 Key Update sent by `direction`.
    pub fn key_update(&mut self, direction: Direction) -> Result<(), DecryptError> {
        let revision = self.codec.config().tls13_revision;
        let state = self.direction_mut(direction);
        let decoder = state.active.as_ref().ok_or(DecryptError::KeyMaterialMissing)?;
        let next = decoder.key_update(revision)?;
        state.active = Some(next);
        Ok(())
    }

    fn switch_tls13_phase(
        &mut self,
        direction: Direction,
        phase: TrafficPhase,
    ) -> Result<(), DecryptError> {
        let (Some(client_random), Some(suite)) = (self.client_random, self.suite) else {
            self.direction_mut(direction).phase = Some(phase);
            return Ok(());
        };
        let decoder = self.tls13_decoder(&client_random, suite, phase, direction)?;
        let state = self.direction_mut(direction);
        state.phase = Some(phase);
        state.active = decoder;
        if state.active.is_none() {
            return Err(DecryptError::KeyMaterialMissing);
        }
        Ok(())
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Decrypt a record sent in `direction`.
    pub fn decrypt_record(
        &mut self,
        direction: Direction,
        content_type: u8,
        record_version: u16,
        ciphertext: &[u8],
    ) -> Result<Plaintext, DecryptError> {
        let codec = &self.codec;
        let state = match direction {
            Direction::ClientToServer => &mut self.client,
            Direction::ServerToClient => &mut self.server,
        };
        let decoder = state.active.as_mut().ok_or(DecryptError::KeyMaterialMissing)?;
        codec.decrypt_record(decoder, content_type, record_version, ciphertext)
    }

    /// Decrypt a DTLS record carrying an explicit epoch and sequence number.
    pub fn decrypt_dtls_record(
        &mut self,
        direction: Direction,
        content_type: u8,
        record_version: u16,
        epoch: u16,
        seq: u64,
        ciphertext: &[u8],
    ) -> Result<Plaintext, DecryptError> {
        let codec = &self.codec;
        let state = match direction {
            Direction::ClientToServer => &mut self.client,
            Direction::ServerToClient => &mut self.server,
        };
        let decoder = state.active.as_mut().ok_or(DecryptError::KeyMaterialMissing)?;
        codec.decrypt_dtls_record(decoder, content_type, record_version, epoch, seq, ciphertext)
    }

    /// Decrypt a record, passing it through unchanged when no keys exist.
    pub fn process_record(
        &mut self,
        direction: Direction,
        content_type: u8,
        record_version: u16,
        payload: &[u8],
    ) -> Result<RecordOutcome, DecryptError> {
        match self.decrypt_record(direction, content_type, record_version, payload) {
            Ok(plaintext) => Ok(RecordOutcome::Decrypted(plaintext)),
            Err(DecryptError::KeyMaterialMissing) => Ok(RecordOutcome::Opaque(payload.to_vec())),
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> SessionState {
        let keyed = [&self.client, &self.server]
            .iter()
            .any(|s| s.active.is_some() || s.pending.is_some());
        if keyed || self.master.is_some() {
            SessionState::KeysMaterialized
        } else if self.version.is_some() {
            SessionState::VersionKnown
        } else if self.suite.is_some() {
            SessionState::CipherKnown
        } else if self.server_random.is_some() {
            SessionState::ServerRandomKnown
        } else if self.client_random.is_some() {
            SessionState::ClientRandomKnown
        } else {
            SessionState::NoKeys
        }
    }

    pub fn client_random(&self) -> Option<&[u8; 32]> {
        self.client_random.as_ref()
    }

    pub fn server_random(&self) -> Option<&[u8; 32]> {
        self.server_random.as_ref()
    }

    pub fn cipher_suite(&self) -> Option<&'static CipherSuiteDescriptor> {
        self.suite
    }

    pub fn version(&self) -> Option<ProtocolVersion> {
        self.version
    }

    pub fn session_id(&self) -> &[u8] {
        &self.session_id
    }

    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    /// Both hellos carried the extended_master_secret extension.
    pub fn extended_master_secret(&self) -> bool {
        self.client_ems && self.server_ems
    }

    pub fn master_secret(&self) -> Option<&SecretMaterial> {
        self.master.as_ref()
    }

    pub fn master_source(&self) -> Option<SecretSource> {
        self.master_source
    }

    pub fn transcript(&self) -> &HandshakeTranscript {
        &self.transcript
    }

    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    /// Active decoder of `direction`.
    pub fn decoder(&self, direction: Direction) -> Option<&Decoder> {
        self.direction(direction).active.as_ref()
    }

    pub fn decoder_mut(&mut self, direction: Direction) -> Option<&mut Decoder> {
        self.direction_mut(direction).active.as_mut()
    }

    pub fn has_pending_keys(&self, direction: Direction) -> bool {
        self.direction(direction).pending.is_some()
    }

    /// TLS 1.3 key phase of `direction`.
    pub fn phase(&self, direction: Direction) -> Option<TrafficPhase> {
        self.direction(direction).phase
    }

    fn direction(&self, direction: Direction) -> &DirectionState {
        match direction {
            Direction::ClientToServer => &self.client,
            Direction::ServerToClient => &self.server,
        }
    }

    fn direction_mut(&mut self, direction: Direction) -> &mut DirectionState {
        match direction {
            Direction::ClientToServer => &mut self.client,
            Direction::ServerToClient => &mut self.server,
        }
    }
}

impl std::fmt::Debug for TlsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsSession")
            .field("state", &self.state())
            .field("version", &self.version)
            .field("suite", &self.suite.map(|s| s.name))
            .field("resumed", &self.resumed)
            .field("client", &self.client)
            .field("server", &self.server)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GCM_SERVER_RECORD: &str = "000000000000000062c8134bcedb6a1711bda45e271000bcfe8c607b55a4408ee3354f0a3ee3ad339ba8589ff788981a";

    fn counting<const N: usize>(start: u8) -> [u8; N] {
        let mut out = [0u8; N];
        for (i, b) in out.iter_mut().enumerate() {
            *b = start.wrapping_add(i as u8);
        }
        out
    }

    fn caches_with_master() -> Arc<SecretCacheSet> {
        let caches = SecretCacheSet::new();
        caches.insert_client_random_master(
            counting(0x00),
            SecretMaterial::new(counting::<48>(0x40).to_vec()),
        );
        Arc::new(caches)
    }

    fn client_hello() -> ClientHello {
        ClientHello {
            random: counting(0x00),
            ..Default::default()
        }
    }

    fn server_hello(cipher_suite: u16, version: u16) -> ServerHello {
        ServerHello {
            random: counting(0x20),
            cipher_suite,
            version,
            ..Default::default()
        }
    }

    #[test]
    fn test_state_progression() {
        let mut session = TlsSession::new(caches_with_master(), DecryptConfig::default());
        assert_eq!(session.state(), SessionState::NoKeys);

        session.process_client_hello(&client_hello());
        assert_eq!(session.state(), SessionState::ClientRandomKnown);

        session
            .process_server_hello(&server_hello(0xc02f, 0x0303))
            .unwrap();
        assert_eq!(session.state(), SessionState::KeysMaterialized);
        assert_eq!(session.master_source(), Some(SecretSource::ClientRandom));
        assert!(session.has_pending_keys(Direction::ServerToClient));
        assert!(session.decoder(Direction::ServerToClient).is_none());
    }

    #[test]
    fn test_records_opaque_until_change_cipher_spec() {
        let record = hex::decode(GCM_SERVER_RECORD).unwrap();
        let mut session = TlsSession::new(caches_with_master(), DecryptConfig::default());
        session.process_client_hello(&client_hello());
        session
            .process_server_hello(&server_hello(0xc02f, 0x0303))
            .unwrap();

        let outcome = session
            .process_record(Direction::ServerToClient, 23, 0x0303, &record)
            .unwrap();
        assert_eq!(outcome, RecordOutcome::Opaque(record.clone()));

        session.change_cipher_spec(Direction::ServerToClient);
        match session
            .process_record(Direction::ServerToClient, 23, 0x0303, &record)
            .unwrap()
        {
            RecordOutcome::Decrypted(pt) => assert_eq!(pt.data, b"HTTP/1.1 200 OK\r\n\r\nhello"),
            other => panic!("expected plaintext, got {other:?}"),
        }

        // Client direction still has only pending keys.
        assert!(session.decoder(Direction::ClientToServer).is_none());
    }

    #[test]
    fn test_missing_keys_is_not_fatal() {
        let mut session = TlsSession::new(Arc::new(SecretCacheSet::new()), DecryptConfig::default());
        session.process_client_hello(&client_hello());
        session
            .process_server_hello(&server_hello(0xc02f, 0x0303))
            .unwrap();
        assert_eq!(session.state(), SessionState::VersionKnown);
        assert_eq!(
            session.try_establish_keys(),
            Err(DecryptError::KeyMaterialMissing)
        );

        session.change_cipher_spec(Direction::ClientToServer);
        let outcome = session
            .process_record(Direction::ClientToServer, 23, 0x0303, b"opaque")
            .unwrap();
        assert_eq!(outcome, RecordOutcome::Opaque(b"opaque".to_vec()));
    }

    #[test]
    fn test_server_hello_validation() {
        let mut session = TlsSession::new(caches_with_master(), DecryptConfig::default());
        session.process_client_hello(&client_hello());

        assert_eq!(
            session.process_server_hello(&server_hello(0x0080, 0x0303)),
            Err(DecryptError::Config(ConfigError::UnknownCipherSuite(0x0080)))
        );
        assert_eq!(
            session.process_server_hello(&server_hello(0xc02f, 0x0999)),
            Err(DecryptError::Config(ConfigError::UnsupportedVersion(0x0999)))
        );
        assert!(matches!(
            session.process_server_hello(&server_hello(0xc02f, 0x0301)),
            Err(DecryptError::Config(ConfigError::VersionMismatch { .. }))
        ));
        assert!(matches!(
            session.process_server_hello(&server_hello(0x1301, 0x0303)),
            Err(DecryptError::Config(ConfigError::VersionMismatch { .. }))
        ));
    }

    #[test]
    fn test_renegotiation_keeps_active_decoders() {
        let mut session = TlsSession::new(caches_with_master(), DecryptConfig::default());
        session.process_client_hello(&client_hello());
        session
            .process_server_hello(&server_hello(0xc02f, 0x0303))
            .unwrap();
        session.change_cipher_spec(Direction::ClientToServer);
        session.change_cipher_spec(Direction::ServerToClient);

        let mut hello = client_hello();
        hello.random = counting(0x80);
        session.process_client_hello(&hello);

        assert!(session.master_secret().is_none());
        assert!(session.decoder(Direction::ClientToServer).is_some());
        assert!(session.decoder(Direction::ServerToClient).is_some());
        assert!(!session.has_pending_keys(Direction::ClientToServer));
    }

    #[test]
    fn test_resumption_detection() {
        let caches = SecretCacheSet::new();
        caches.insert_session_master(&[0xaa; 32], SecretMaterial::new(vec![1u8; 48]));
        let mut session = TlsSession::new(Arc::new(caches), DecryptConfig::default());

        let mut hello = client_hello();
        hello.session_id = vec![0xaa; 32];
        session.process_client_hello(&hello);

        let mut server = server_hello(0x002f, 0x0303);
        server.session_id = vec![0xaa; 32];
        session.process_server_hello(&server).unwrap();

        assert!(session.is_resumed());
        assert_eq!(session.master_source(), Some(SecretSource::SessionId));
    }

    #[test]
    fn test_extended_master_secret_waits_for_key_exchange() {
        let caches = Arc::new(SecretCacheSet::new());
        caches.insert_client_random_premaster(counting(0x00), SecretMaterial::new(vec![3u8; 48]));
        let mut session = TlsSession::new(caches, DecryptConfig::default());

        let mut hello = client_hello();
        hello.extended_master_secret = true;
        session.process_client_hello(&hello);
        let mut server = server_hello(0x009c, 0x0303);
        server.extended_master_secret = true;
        session.process_server_hello(&server).unwrap();
        assert!(session.extended_master_secret());
        assert!(session.master_secret().is_none());

        session
            .process_client_key_exchange(b"\x10\x00\x00\x00", None)
            .unwrap();
        assert_eq!(
            session.master_source(),
            Some(SecretSource::PremasterByClientRandom)
        );
    }

    #[test]
    fn test_ticket_issued_before_master_is_cached_later() {
        let caches = Arc::new(SecretCacheSet::new());
        let mut session = TlsSession::new(caches.clone(), DecryptConfig::default());
        session.process_client_hello(&client_hello());
        session
            .process_server_hello(&server_hello(0x009c, 0x0303))
            .unwrap();

        session.process_new_session_ticket(b"ticket");
        assert!(caches.master_by_ticket(b"ticket").is_none());

        session
            .set_pre_master_secret(SecretMaterial::new(vec![3u8; 48]))
            .unwrap();
        assert_eq!(
            caches.master_by_ticket(b"ticket").as_ref(),
            session.master_secret()
        );
    }

    #[test]
    fn test_tls13_ticket_not_cached() {
        let caches = Arc::new(SecretCacheSet::new());
        let mut session = TlsSession::new(caches.clone(), DecryptConfig::default());
        session.process_client_hello(&client_hello());
        session
            .process_server_hello(&server_hello(0x1301, 0x0304))
            .unwrap();
        session.process_new_session_ticket(b"ticket");
        assert!(caches.master_by_ticket(b"ticket").is_none());
    }

    #[test]
    fn test_early_data_accepted_keeps_early_phase() {
        let mut session = TlsSession::new(Arc::new(SecretCacheSet::new()), DecryptConfig::default());
        let mut hello = client_hello();
        hello.early_data = true;
        session.process_client_hello(&hello);
        session
            .process_server_hello(&server_hello(0x1301, 0x0304))
            .unwrap();

        session.process_encrypted_extensions(true).unwrap();
        assert_eq!(session.phase(Direction::ClientToServer), Some(TrafficPhase::Early));

        // Rejection without handshake secrets still moves the phase on
        session.process_encrypted_extensions(false).unwrap();
        assert_eq!(
            session.phase(Direction::ClientToServer),
            Some(TrafficPhase::Handshake)
        );
    }

    #[test]
    fn test_tls13_without_secrets() {
        let mut session = TlsSession::new(Arc::new(SecretCacheSet::new()), DecryptConfig::default());
        session.process_client_hello(&client_hello());
        session
            .process_server_hello(&server_hello(0x1301, 0x0304))
            .unwrap();
        assert_eq!(session.phase(Direction::ServerToClient), Some(TrafficPhase::Handshake));
        assert_eq!(
            session.mark_finished(Direction::ServerToClient),
            Err(DecryptError::KeyMaterialMissing)
        );
        assert_eq!(
            session.key_update(Direction::ClientToServer),
            Err(DecryptError::KeyMaterialMissing)
        );
    }
}
