//! Recording engine: capture lifecycle and the gain → silence-gate →
//! compress pipeline.

pub mod buffer;
pub mod chunk;
pub mod gain;
pub mod silence;

mod codec;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::backend::{CaptureBackend, CaptureDataCallback, CaptureSpec, CaptureStream};
use crate::format::RecordingFormat;

use self::buffer::CaptureBuffer;

/// Capture from the default input device into a drainable buffer of
/// compressed frames.
///
/// The device callback runs the pipeline on every fired buffer: apply
/// gain, drop the buffer if it never crosses the silence threshold,
/// otherwise compress and enqueue it.
pub struct RecordingEngine {
    backend: Box<dyn CaptureBackend>,
    buffer: Arc<CaptureBuffer>,
    stream: Option<Box<dyn CaptureStream>>,
    sample_rate: u32,
    channels: u8,
    format: RecordingFormat,
    /// Silence threshold as an unscaled fraction in [0, 1] (f32 bits).
    threshold_fraction: Arc<AtomicU32>,
    /// Gain as an unscaled fraction in [0, ∞) (f32 bits); 1.0 is unity.
    gain_fraction: Arc<AtomicU32>,
}

impl RecordingEngine {
    pub fn new(backend: Box<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            buffer: Arc::new(CaptureBuffer::new()),
            stream: None,
            sample_rate: 0,
            channels: 0,
            format: RecordingFormat::default(),
            threshold_fraction: Arc::new(AtomicU32::new(0.0f32.to_bits())),
            gain_fraction: Arc::new(AtomicU32::new(1.0f32.to_bits())),
        }
    }

    /// Start a capture session. Idempotent-on-success; returns `false`
    /// when the device layer fails to come up.
    pub fn start(&mut self, sample_rate: u32, channels: u8, format: RecordingFormat) -> bool {
        if self.stream.is_some() {
            return true;
        }

        // Session metadata is stored (and captured by the pipeline
        // callback) before the device starts firing.
        self.sample_rate = sample_rate;
        self.channels = channels;
        self.format = format;

        let spec = CaptureSpec {
            sample_rate,
            channels,
            format,
        };
        let buffer = Arc::clone(&self.buffer);
        let gain = Arc::clone(&self.gain_fraction);
        let threshold = Arc::clone(&self.threshold_fraction);
        let on_data: CaptureDataCallback = Box::new(move |pcm| {
            capture_pipeline(format, pcm, &gain, &threshold, &buffer);
        });

        match self.backend.open_stream(spec, on_data) {
            Ok(stream) => {
                self.stream = Some(stream);
                log::info!("recording started: {sample_rate} Hz, {channels} ch, {format:?}");
                true
            }
            Err(e) => {
                self.sample_rate = 0;
                log::error!("recording start failed: {e}");
                false
            }
        }
    }

    /// Stop the capture session. The sample rate is cleared; channels
    /// and format keep reporting the last session. Idempotent.
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            self.sample_rate = 0;
            log::info!("recording stopped");
        }
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.stream.is_some()
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    #[must_use]
    pub fn format(&self) -> RecordingFormat {
        self.format
    }

    /// Set the silence threshold from a percent, clamped into [0, 100].
    pub fn set_sound_threshold_percent(&self, percent: f32) {
        let fraction = percent.clamp(0.0, 100.0) / 100.0;
        self.threshold_fraction
            .store(fraction.to_bits(), Ordering::Relaxed);
    }

    #[must_use]
    pub fn sound_threshold_percent(&self) -> f32 {
        f32::from_bits(self.threshold_fraction.load(Ordering::Relaxed)) * 100.0
    }

    /// Set the capture gain from a percent; negatives clamp to 0, values
    /// above 100 amplify.
    pub fn set_sound_gain_percent(&self, percent: f32) {
        let fraction = if percent < 0.0 { 0.0 } else { percent / 100.0 };
        self.gain_fraction
            .store(fraction.to_bits(), Ordering::Relaxed);
    }

    #[must_use]
    pub fn sound_gain_percent(&self) -> f32 {
        f32::from_bits(self.gain_fraction.load(Ordering::Relaxed)) * 100.0
    }

    /// Drop everything buffered without stopping the device.
    pub fn clear(&self) {
        self.buffer.clear();
    }

    /// Wire-encoded size of everything currently buffered.
    #[must_use]
    pub fn size_unread(&self) -> usize {
        self.buffer.size_unread()
    }

    /// Drain buffered frames, wire-encoded, up to `max_bytes`.
    #[must_use]
    pub fn unread(&self, max_bytes: usize) -> Vec<u8> {
        self.buffer.drain_up_to(max_bytes)
    }

    /// Decode a previously drained byte stream back to raw PCM.
    #[must_use]
    pub fn decode_chunks(&self, chunks: &[u8]) -> Vec<u8> {
        chunk::decode_chunks(chunks)
    }
}

impl Drop for RecordingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Device-thread pipeline: gain, silence gate, compress-and-buffer.
///
/// Blocks only on the capture buffer's own mutex.
fn capture_pipeline(
    format: RecordingFormat,
    pcm: &[u8],
    gain_bits: &AtomicU32,
    threshold_bits: &AtomicU32,
    buffer: &CaptureBuffer,
) {
    let gain = f32::from_bits(gain_bits.load(Ordering::Relaxed));
    let adjusted = gain::apply_gain(format, pcm, gain);

    let threshold = f32::from_bits(threshold_bits.load(Ordering::Relaxed));
    if silence::is_silence(format, &adjusted, threshold) {
        return;
    }

    buffer.push(&adjusted);
}
