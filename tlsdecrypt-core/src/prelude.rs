//! Convenient re-exports for common usage.
//!
//! This module provides a curated set of the most commonly used types
//! from tlsdecrypt-core, allowing you to import them with a single `use` statement.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tlsdecrypt_core::prelude::*;
//!
//! // Secrets shared by every session
//! let caches = Arc::new(SecretCacheSet::new());
//! let session = TlsSession::new(caches, DecryptConfig::default());
//! assert_eq!(session.state(), SessionState::NoKeys);
//! ```

// Session types
pub use crate::session::{ClientHello, RecordOutcome, ServerHello, SessionState, TlsSession};

// Secret sources
pub use crate::keylog::KeyLog;
pub use crate::secrets::{PremasterDecryptor, SecretCacheSet, SecretMaterial};

// Record layer
pub use crate::config::{DecryptConfig, Tls13Revision};
pub use crate::kdf::Direction;
pub use crate::record::Plaintext;

// Error types
pub use crate::error::{DecryptError, Error, Result};
