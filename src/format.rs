//! Capture sample formats.

/// PCM sample format of a capture session.
///
/// Integer discriminants encode the bit depth, so the value can cross
/// host boundaries unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RecordingFormat {
    /// 32-bit float samples in [-1.0, 1.0].
    Float32 = 0,
    /// 16-bit signed samples in [-32768, 32767].
    Signed16 = 16,
    /// 24-bit signed samples in [-8388608, 8388607], packed as 3
    /// little-endian bytes.
    Signed24 = 24,
    /// 32-bit signed samples covering the full i32 range.
    Signed32 = 32,
    /// 8-bit unsigned samples in [0, 255], silence centre at 128.
    Unsigned8 = 8,
}

impl Default for RecordingFormat {
    fn default() -> Self {
        RecordingFormat::Float32
    }
}

impl RecordingFormat {
    /// Width of one sample in bytes.
    #[must_use]
    pub fn bytes_per_sample(self) -> usize {
        match self {
            RecordingFormat::Float32 | RecordingFormat::Signed32 => 4,
            RecordingFormat::Signed24 => 3,
            RecordingFormat::Signed16 => 2,
            RecordingFormat::Unsigned8 => 1,
        }
    }

    /// Width of one interleaved frame in bytes.
    #[must_use]
    pub fn bytes_per_frame(self, channels: u8) -> usize {
        self.bytes_per_sample() * channels as usize
    }

    /// Positive full-scale amplitude of the format.
    #[must_use]
    pub(crate) fn full_scale(self) -> f64 {
        match self {
            RecordingFormat::Float32 => 1.0,
            RecordingFormat::Signed16 => 32767.0,
            RecordingFormat::Signed24 => 8_388_607.0,
            RecordingFormat::Signed32 => 2_147_483_647.0,
            RecordingFormat::Unsigned8 => 127.0,
        }
    }
}
