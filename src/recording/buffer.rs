//! Thread-safe FIFO of compressed capture frames.
//!
//! Wire frame layout (little-endian):
//!
//! ```text
//! offset  size  field
//!   0      4    original PCM length
//!   4      4    payload length
//!   8      N    payload (deflated PCM, or raw PCM when lengths match)
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use super::codec;

/// Serialized size of a frame header on the wire.
pub const FRAME_HEADER_BYTES: usize = 8;

struct CaptureFrame {
    original_bytes: u32,
    payload: Vec<u8>,
}

impl CaptureFrame {
    fn wire_size(&self) -> usize {
        FRAME_HEADER_BYTES + self.payload.len()
    }
}

/// FIFO of compressed capture frames, drained front-first.
///
/// All mutation happens under one internal mutex, so the device capture
/// thread pushes while host threads drain.
#[derive(Default)]
pub struct CaptureBuffer {
    frames: Mutex<VecDeque<CaptureFrame>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compress and enqueue one callback's worth of PCM. Empty input is
    /// a no-op.
    ///
    /// A deflate failure, or a deflate that does not shrink the input,
    /// stores the raw bytes instead; equal header lengths are the wire
    /// marker for that fallback.
    pub fn push(&self, pcm: &[u8]) {
        if pcm.is_empty() {
            return;
        }

        let payload = match codec::deflate(pcm) {
            Ok(deflated) if deflated.len() < pcm.len() => deflated,
            Ok(_) => pcm.to_vec(),
            Err(e) => {
                log::debug!("frame compression failed, storing raw: {e}");
                pcm.to_vec()
            }
        };

        let frame = CaptureFrame {
            original_bytes: pcm.len() as u32,
            payload,
        };
        self.frames
            .lock()
            .expect("capture buffer lock poisoned")
            .push_back(frame);
    }

    /// Serialize and remove the longest prefix of frames whose total
    /// wire size fits in `max_bytes`.
    ///
    /// The first frame that would overflow the budget is left in place;
    /// if even the front frame does not fit, nothing is consumed and an
    /// empty buffer is returned.
    pub fn drain_up_to(&self, max_bytes: usize) -> Vec<u8> {
        let mut frames = self.frames.lock().expect("capture buffer lock poisoned");

        let mut take = 0;
        let mut total = 0;
        for frame in frames.iter() {
            let size = frame.wire_size();
            if total + size > max_bytes {
                break;
            }
            total += size;
            take += 1;
        }

        if take == 0 {
            return Vec::new();
        }

        let mut out = Vec::with_capacity(total);
        for frame in frames.drain(..take) {
            out.extend_from_slice(&frame.original_bytes.to_le_bytes());
            out.extend_from_slice(&(frame.payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&frame.payload);
        }
        out
    }

    /// Total wire-encoded size of everything currently buffered.
    pub fn size_unread(&self) -> usize {
        self.frames
            .lock()
            .expect("capture buffer lock poisoned")
            .iter()
            .map(CaptureFrame::wire_size)
            .sum()
    }

    /// Drop all buffered frames.
    pub fn clear(&self) {
        self.frames
            .lock()
            .expect("capture buffer lock poisoned")
            .clear();
    }
}
