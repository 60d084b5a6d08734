//! Master-secret export in key log format.

use std::fmt;

use crate::secrets::{SecretCacheSet, SecretMaterial};
use crate::session::TlsSession;

/// A session's master secret keyed by its client random.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedKey {
    pub client_random: [u8; 32],
    pub master_secret: SecretMaterial,
}

impl ExportedKey {
    /// Render as `CLIENT_RANDOM <client random> <master secret>`.
    pub fn to_keylog_line(&self) -> String {
        format!(
            "CLIENT_RANDOM {} {}",
            hex::encode(self.client_random),
            hex::encode(self.master_secret.as_bytes())
        )
    }
}

impl fmt::Display for ExportedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_keylog_line())
    }
}

/// Export the master secret of a keyed pre-TLS 1.3 session.
pub fn export_key(session: &TlsSession) -> Option<ExportedKey> {
    let client_random = *session.client_random()?;
    let master_secret = session.master_secret()?.clone();
    Some(ExportedKey {
        client_random,
        master_secret,
    })
}

impl SecretCacheSet {
    /// Every master secret known by client random, sorted.
    pub fn exported_keys(&self) -> Vec<ExportedKey> {
        self.client_random_masters()
            .into_iter()
            .map(|(client_random, master_secret)| ExportedKey {
                client_random,
                master_secret,
            })
            .collect()
    }
}
