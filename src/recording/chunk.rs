//! Decoding of drained capture byte streams back to raw PCM.

use super::buffer::FRAME_HEADER_BYTES;
use super::codec;

/// Decode a concatenation of wire frames into the original PCM stream.
///
/// Frames whose header lengths match carry raw PCM (the compression
/// fallback) and are appended as-is; inflate failures also fall back to
/// the payload bytes. A truncated header or payload stops the walk and
/// whatever decoded so far is returned.
#[must_use]
pub fn decode_chunks(chunks: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(chunks.len() + chunks.len() / 2);
    let mut rest = chunks;

    while rest.len() >= FRAME_HEADER_BYTES {
        let original = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let payload_len = u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;

        let Some(payload) = rest.get(FRAME_HEADER_BYTES..FRAME_HEADER_BYTES + payload_len)
        else {
            log::warn!(
                "chunk stream truncated: frame wants {payload_len} payload bytes, {} left",
                rest.len() - FRAME_HEADER_BYTES
            );
            return out;
        };

        if original == payload_len {
            out.extend_from_slice(payload);
        } else {
            match codec::inflate(payload, original) {
                Ok(pcm) => out.extend_from_slice(&pcm),
                Err(e) => {
                    log::warn!("chunk inflate failed ({e}), appending payload raw");
                    out.extend_from_slice(payload);
                }
            }
        }

        rest = &rest[FRAME_HEADER_BYTES + payload_len..];
    }

    if !rest.is_empty() {
        log::warn!("{} trailing bytes after last whole frame", rest.len());
    }
    out
}
