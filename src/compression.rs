//! Stateless zlib codec for text payloads.
//!
//! The compressed form is a plain zlib stream (header + deflate body + adler32
//! trailer), so it is self-describing and validated on decode without any
//! out-of-band parameters.

use crate::error::Error;
use crate::Result;
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::Write;

/// Output growth step while inflating.
const CHUNK: usize = 4096;

/// Compress `input` into a self-contained zlib stream.
pub fn compress(input: &str) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(input.len() / 2 + 16),
        Compression::default(),
    );
    // Writes into a Vec cannot fail.
    if let Err(e) = encoder.write_all(input.as_bytes()) {
        tracing::warn!(error = %e, "zlib encoder rejected input");
    }
    match encoder.finish() {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "zlib encoder failed to finish");
            Vec::new()
        }
    }
}

/// Inverse of [`compress`].
///
/// Fails with [`Error::CorruptPayload`] when `input` is not exactly one
/// complete zlib stream or does not decode to valid UTF-8.
pub fn decompress(input: &[u8]) -> Result<String> {
    let mut inflater = Decompress::new(true);
    let mut bytes = Vec::with_capacity(input.len().saturating_mul(4).max(CHUNK));
    loop {
        if bytes.len() == bytes.capacity() {
            bytes.reserve(CHUNK);
        }
        let (before_in, before_out) = (inflater.total_in(), inflater.total_out());
        let status = inflater
            .decompress_vec(&input[before_in as usize..], &mut bytes, FlushDecompress::None)
            .map_err(|e| Error::CorruptPayload(format!("zlib: {}", e)))?;
        match status {
            Status::StreamEnd => break,
            // No progress with room left in the output: the stream is truncated.
            _ if inflater.total_in() == before_in && inflater.total_out() == before_out => {
                return Err(Error::CorruptPayload("unexpected end of zlib stream".into()));
            }
            _ => {}
        }
    }
    let consumed = inflater.total_in() as usize;
    if consumed != input.len() {
        return Err(Error::CorruptPayload(format!(
            "{} trailing bytes after zlib stream",
            input.len() - consumed
        )));
    }
    String::from_utf8(bytes).map_err(|e| Error::CorruptPayload(format!("utf-8: {}", e)))
}
