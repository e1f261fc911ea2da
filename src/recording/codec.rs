//! Deflate adapters for capture frames.
//!
//! Compression here is best-effort: callers keep the raw bytes when
//! either direction fails, so errors never propagate past the capture
//! buffer.

use std::io;
use std::io::Write;

use flate2::write::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;

/// Deflate `data` at the fastest compression level.
pub fn deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::fast());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Inflate `data`, which must expand to exactly `original_len` bytes.
pub fn inflate(data: &[u8], original_len: usize) -> io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(Vec::with_capacity(original_len));
    decoder.write_all(data)?;
    let out = decoder.finish()?;
    if out.len() != original_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("inflated to {} bytes, expected {original_len}", out.len()),
        ));
    }
    Ok(out)
}
