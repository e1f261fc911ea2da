//! Host-facing facade over the playback and recording engines.

use crate::backend::cpal_backend::{CpalCapture, CpalPlayback};
use crate::backend::{CaptureBackend, PlaybackBackend};
use crate::format::RecordingFormat;
use crate::playback::request::AudioRequest;
use crate::playback::PlaybackEngine;
use crate::recording::RecordingEngine;

/// The audio manager: independent playback and capture services behind
/// one object.
///
/// `AudioMan` is move-only — the engines own OS device handles and
/// worker threads, so there is deliberately no `Clone`. Dropping it
/// cancels outstanding playback and stops any capture session.
pub struct AudioMan {
    playback: PlaybackEngine,
    recording: RecordingEngine,
}

impl Default for AudioMan {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioMan {
    /// Build a manager over the platform (cpal) audio backends.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backends(Box::new(CpalPlayback::new()), Box::new(CpalCapture::new()))
    }

    /// Build a manager over caller-supplied backends. Tests use this to
    /// run the full lifecycle against deterministic fakes.
    #[must_use]
    pub fn with_backends(
        playback: Box<dyn PlaybackBackend>,
        capture: Box<dyn CaptureBackend>,
    ) -> Self {
        Self {
            playback: PlaybackEngine::new(playback),
            recording: RecordingEngine::new(capture),
        }
    }

    // *** playback *** //

    /// Bring the playback device up. Idempotent-on-success.
    pub fn init_playback(&mut self) -> bool {
        self.playback.init()
    }

    /// Cancel all outstanding playback and tear the device down.
    /// Idempotent.
    pub fn uninit_playback(&mut self) {
        self.playback.uninit();
    }

    /// Submit an encoded audio blob (WAV/MP3/FLAC bytes) for playback.
    #[must_use]
    pub fn submit_audio(&self, data: &[u8]) -> AudioRequest {
        self.playback.submit(data)
    }

    /// Master volume percent: negatives clamp to 0, values above 100
    /// amplify.
    pub fn set_playback_volume_percent(&self, percent: f32) {
        self.playback.set_volume_percent(percent);
    }

    #[must_use]
    pub fn playback_volume_percent(&self) -> f32 {
        self.playback.volume_percent()
    }

    /// Cancel every outstanding playback request and wait for each to
    /// terminate.
    pub fn cancel_all_playback(&self) {
        self.playback.cancel_all();
    }

    // *** recording *** //

    /// Start capturing from the default input device. Idempotent-on-
    /// success.
    pub fn start_recording(
        &mut self,
        sample_rate: u32,
        channels: u8,
        format: RecordingFormat,
    ) -> bool {
        self.recording.start(sample_rate, channels, format)
    }

    /// Stop the capture session; already-buffered frames stay drainable.
    pub fn stop_recording(&mut self) {
        self.recording.stop();
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording.is_recording()
    }

    /// Sample rate of the running session, or 0 when stopped.
    #[must_use]
    pub fn recording_sample_rate(&self) -> u32 {
        self.recording.sample_rate()
    }

    /// Channel count of the current or last session.
    #[must_use]
    pub fn recording_channels(&self) -> u8 {
        self.recording.channels()
    }

    /// Sample format of the current or last session.
    #[must_use]
    pub fn recording_format(&self) -> RecordingFormat {
        self.recording.format()
    }

    /// Silence threshold percent in [0, 100].
    pub fn set_recording_sound_threshold_percent(&self, percent: f32) {
        self.recording.set_sound_threshold_percent(percent);
    }

    #[must_use]
    pub fn recording_sound_threshold_percent(&self) -> f32 {
        self.recording.sound_threshold_percent()
    }

    /// Capture gain percent: 100 is unity, negatives clamp to 0, no
    /// upper bound.
    pub fn set_recording_sound_gain_percent(&self, percent: f32) {
        self.recording.set_sound_gain_percent(percent);
    }

    #[must_use]
    pub fn recording_sound_gain_percent(&self) -> f32 {
        self.recording.sound_gain_percent()
    }

    /// Drop all unread capture frames without stopping the device.
    pub fn clear_recording(&self) {
        self.recording.clear();
    }

    /// Wire-encoded size of everything captured but not yet drained.
    #[must_use]
    pub fn size_unread_recording(&self) -> usize {
        self.recording.size_unread()
    }

    /// Drain captured frames as a self-describing byte stream of at most
    /// `max_bytes`.
    #[must_use]
    pub fn get_unread_recording(&self, max_bytes: usize) -> Vec<u8> {
        self.recording.unread(max_bytes)
    }

    /// Decode a drained byte stream back to raw PCM in the capture
    /// format and channel layout.
    #[must_use]
    pub fn decode_recording_chunks(&self, chunks: &[u8]) -> Vec<u8> {
        self.recording.decode_chunks(chunks)
    }
}
