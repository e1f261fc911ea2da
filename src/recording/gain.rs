//! Per-format gain kernels for captured PCM.

use crate::format::RecordingFormat;

/// Multiply every sample in `data` by `gain`, saturating to the format's
/// representable range.
///
/// `data` is packed little-endian PCM; a gain of 1.0 is unity. Unsigned8
/// is scaled as an unsigned value, so gain moves the midpoint too.
#[must_use]
pub fn apply_gain(format: RecordingFormat, data: &[u8], gain: f32) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }

    match format {
        RecordingFormat::Float32 => gain_f32(data, gain),
        RecordingFormat::Signed16 => gain_s16(data, gain),
        RecordingFormat::Signed24 => gain_s24(data, gain),
        RecordingFormat::Signed32 => gain_s32(data, gain),
        RecordingFormat::Unsigned8 => gain_u8(data, gain),
    }
}

fn gain_f32(data: &[u8], gain: f32) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for s in data.chunks_exact(4) {
        let v = f32::from_le_bytes([s[0], s[1], s[2], s[3]]) * gain;
        out.extend_from_slice(&v.clamp(-1.0, 1.0).to_le_bytes());
    }
    copy_tail(&mut out, data, 4);
    out
}

fn gain_s16(data: &[u8], gain: f32) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for s in data.chunks_exact(2) {
        let v = f32::from(i16::from_le_bytes([s[0], s[1]])) * gain;
        out.extend_from_slice(&(v.clamp(-32768.0, 32767.0) as i16).to_le_bytes());
    }
    copy_tail(&mut out, data, 2);
    out
}

fn gain_s24(data: &[u8], gain: f32) -> Vec<u8> {
    // Each sample is 3 bytes; anything else is not valid 24-bit PCM.
    if data.len() % 3 != 0 {
        return data.to_vec();
    }

    let mut out = Vec::with_capacity(data.len());
    for s in data.chunks_exact(3) {
        let v = sign_extend_s24(s);
        let scaled =
            (f64::from(v) * f64::from(gain)).clamp(-8_388_608.0, 8_388_607.0) as i32;
        out.extend_from_slice(&scaled.to_le_bytes()[..3]);
    }
    out
}

fn gain_s32(data: &[u8], gain: f32) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for s in data.chunks_exact(4) {
        let v = f64::from(i32::from_le_bytes([s[0], s[1], s[2], s[3]])) * f64::from(gain);
        let clamped = v.clamp(-2_147_483_648.0, 2_147_483_647.0) as i32;
        out.extend_from_slice(&clamped.to_le_bytes());
    }
    copy_tail(&mut out, data, 4);
    out
}

fn gain_u8(data: &[u8], gain: f32) -> Vec<u8> {
    data.iter()
        .map(|&s| (f32::from(s) * gain).clamp(0.0, 255.0) as u8)
        .collect()
}

/// Sign-extend a packed little-endian 24-bit sample to i32.
pub(crate) fn sign_extend_s24(s: &[u8]) -> i32 {
    let mut v = i32::from(s[0]) | i32::from(s[1]) << 8 | i32::from(s[2]) << 16;
    if v & 0x0080_0000 != 0 {
        v |= !0x00ff_ffff;
    }
    v
}

/// Carry over bytes that do not form a whole sample.
fn copy_tail(out: &mut Vec<u8>, data: &[u8], width: usize) {
    let tail = data.len() - data.len() % width;
    out.extend_from_slice(&data[tail..]);
}
