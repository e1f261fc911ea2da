//! Per-buffer silence detection for captured PCM.

use crate::format::RecordingFormat;

use super::gain::sign_extend_s24;

/// True iff every sample in `data` deviates from the format's silence
/// centre by strictly less than `threshold` of full scale.
///
/// `threshold` is the unscaled fraction in [0, 1]. A threshold of 0
/// classifies nothing as silence, so every buffer passes the gate.
#[must_use]
pub fn is_silence(format: RecordingFormat, data: &[u8], threshold: f32) -> bool {
    if data.is_empty() {
        return true;
    }

    let limit = format.full_scale() * f64::from(threshold);
    match format {
        RecordingFormat::Float32 => data
            .chunks_exact(4)
            .all(|s| f64::from(f32::from_le_bytes([s[0], s[1], s[2], s[3]]).abs()) < limit),
        RecordingFormat::Signed16 => data
            .chunks_exact(2)
            .all(|s| f64::from(i16::from_le_bytes([s[0], s[1]]).unsigned_abs()) < limit),
        RecordingFormat::Signed24 => {
            if data.len() % 3 != 0 {
                return false;
            }
            data.chunks_exact(3)
                .all(|s| f64::from(sign_extend_s24(s).unsigned_abs()) < limit)
        }
        RecordingFormat::Signed32 => data.chunks_exact(4).all(|s| {
            f64::from(i32::from_le_bytes([s[0], s[1], s[2], s[3]]).unsigned_abs()) < limit
        }),
        // Unsigned8 is centred on 128, not 0.
        RecordingFormat::Unsigned8 => data
            .iter()
            .all(|&s| f64::from((i32::from(s) - 128).unsigned_abs()) < limit),
    }
}
