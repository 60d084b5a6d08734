//! DEFLATE record decompression (RFC 3749).
//!
//! The compression state spans every record of one direction, so each
//! [`Decoder`](crate::decoder::Decoder) owns its own [`Decompressor`].

use std::fmt;

use flate2::{Decompress, FlushDecompress, Status};

use crate::error::DecryptError;

/// Compression method byte for DEFLATE in the ServerHello.
pub const COMPRESSION_DEFLATE: u8 = 1;

/// Persistent zlib inflater for one direction.
pub struct Decompressor {
    inner: Decompress,
}

impl Decompressor {
    pub fn new() -> Self {
        Self {
            inner: Decompress::new(true),
        }
    }

    /// Inflate one record, failing if it expands beyond `limit` bytes.
    pub fn decompress(&mut self, input: &[u8], limit: usize) -> Result<Vec<u8>, DecryptError> {
        let mut out = Vec::with_capacity(limit.saturating_add(1));
        let mut consumed = 0;

        while consumed < input.len() {
            let in_before = self.inner.total_in();
            let out_before = self.inner.total_out();

            let status = self
                .inner
                .decompress_vec(&input[consumed..], &mut out, FlushDecompress::Sync)
                .map_err(|e| DecryptError::Decompression(e.to_string()))?;

            consumed += (self.inner.total_in() - in_before) as usize;
            if out.len() > limit {
                return Err(DecryptError::Decompression(format!(
                    "record expands beyond {limit} bytes"
                )));
            }

            let progressed =
                self.inner.total_in() != in_before || self.inner.total_out() != out_before;
            if matches!(status, Status::StreamEnd) || !progressed {
                break;
            }
        }

        Ok(out)
    }
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Decompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decompressor")
            .field("total_in", &self.inner.total_in())
            .field("total_out", &self.inner.total_out())
            .finish()
    }
}
