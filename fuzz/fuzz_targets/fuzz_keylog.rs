//! Fuzz target for the key log parser.
//!
//! Lenient parsing must never fail on content, and every parsed entry must
//! load into the caches without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tlsdecrypt_core::{KeyLog, SecretCacheSet};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let keylog = KeyLog::parse(text).expect("lenient parsing only fails on I/O");
    let caches = SecretCacheSet::new();
    keylog.load_into(&caches);

    let _ = KeyLog::parse_strict(text);
});
