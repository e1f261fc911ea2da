//! Platform audio collaborator contract.
//!
//! The engines talk to the device layer through these object-safe
//! traits. [`cpal_backend`] provides the production implementation;
//! tests substitute deterministic fakes so the lifecycle logic runs
//! without hardware.

pub mod cpal_backend;

use std::fmt;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use crate::decoder::AudioData;
use crate::format::RecordingFormat;

/// Error from the platform audio layer.
#[derive(Debug)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audio backend error: {}", self.0)
    }
}

impl std::error::Error for BackendError {}

/// Hook fired exactly once from the device callback when a sound reaches
/// natural end of stream.
///
/// The device layer forbids tearing the sound down from inside its own
/// callback, so the hook must only schedule work elsewhere.
pub type EndOfStreamHook = Box<dyn FnOnce() + Send>;

/// Callback receiving one device-callback worth of captured PCM, packed
/// in the session's format. Runs on the device capture thread.
pub type CaptureDataCallback = Box<dyn FnMut(&[u8]) + Send>;

/// Capture session parameters.
#[derive(Debug, Clone, Copy)]
pub struct CaptureSpec {
    pub sample_rate: u32,
    pub channels: u8,
    pub format: RecordingFormat,
}

/// Output side of the device collaborator.
pub trait PlaybackBackend: Send {
    /// Open the playback device. Idempotent-on-success.
    fn open(&mut self) -> Result<(), BackendError>;

    /// Close the playback device. Idempotent.
    fn close(&mut self);

    /// Create and start a playing sound over `audio`.
    ///
    /// `master_gain` holds f32 bits read live by the output callback;
    /// `on_end` fires once at natural end.
    fn spawn_sound(
        &self,
        audio: Arc<AudioData>,
        master_gain: Arc<AtomicU32>,
        on_end: EndOfStreamHook,
    ) -> Result<Box<dyn SoundHandle>, BackendError>;
}

/// A playing sound owned by a playback request.
pub trait SoundHandle: Send {
    /// Tear the sound down. Idempotent; once this returns the device
    /// issues no further calls for this sound.
    fn stop(&mut self);
}

/// Input side of the device collaborator.
pub trait CaptureBackend: Send {
    /// Open and start a capture stream; `on_data` begins firing once the
    /// device runs.
    fn open_stream(
        &mut self,
        spec: CaptureSpec,
        on_data: CaptureDataCallback,
    ) -> Result<Box<dyn CaptureStream>, BackendError>;
}

/// A running capture session.
pub trait CaptureStream: Send {
    /// Stop the device. Idempotent.
    fn stop(&mut self);
}
