//! Fuzz target for record decompression.
//!
//! Feeds arbitrary bytes to the DEFLATE decompressor; output must respect
//! the size limit.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tlsdecrypt_core::{Decompressor, MAX_PLAINTEXT_LEN};

fuzz_target!(|data: &[u8]| {
    let mut decompressor = Decompressor::new();
    for chunk in data.chunks(512) {
        match decompressor.decompress(chunk, MAX_PLAINTEXT_LEN) {
            Ok(out) => assert!(out.len() <= MAX_PLAINTEXT_LEN),
            Err(_) => return,
        }
    }
});
