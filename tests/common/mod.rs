//! Deterministic fake backends and fixtures for lifecycle tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use soundbox::backend::{
    BackendError, CaptureBackend, CaptureDataCallback, CaptureSpec, CaptureStream,
    EndOfStreamHook, PlaybackBackend, SoundHandle,
};

/// Playback backend whose sounds "play" in real time: a worker thread
/// sleeps for the decoded clip duration and then fires the end hook,
/// standing in for the device callback thread.
#[derive(Default)]
pub struct FakePlayback {
    pub fail_open: bool,
    pub fail_spawn: bool,
    pub spawned: Arc<AtomicUsize>,
}

impl FakePlayback {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaybackBackend for FakePlayback {
    fn open(&mut self) -> Result<(), BackendError> {
        if self.fail_open {
            Err(BackendError("fake playback device missing".into()))
        } else {
            Ok(())
        }
    }

    fn close(&mut self) {}

    fn spawn_sound(
        &self,
        audio: Arc<soundbox::decoder::AudioData>,
        _master_gain: Arc<std::sync::atomic::AtomicU32>,
        on_end: EndOfStreamHook,
    ) -> Result<Box<dyn SoundHandle>, BackendError> {
        if self.fail_spawn {
            return Err(BackendError("fake sound refused".into()));
        }
        self.spawned.fetch_add(1, Ordering::SeqCst);

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let play_for = Duration::from_secs_f64(audio.duration_secs());
        let thread = thread::spawn(move || match stop_rx.recv_timeout(play_for) {
            // Stopped (or handle dropped) before the clip ran out.
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => on_end(),
        });

        Ok(Box::new(FakeSound {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }))
    }
}

struct FakeSound {
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SoundHandle for FakeSound {
    fn stop(&mut self) {
        self.stop_tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for FakeSound {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Shared side of [`FakeCapture`]: the test keeps a handle and plays the
/// device role by firing the installed callback directly.
#[derive(Default)]
pub struct CaptureHarness {
    callback: Mutex<Option<CaptureDataCallback>>,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
}

impl CaptureHarness {
    /// Fire one device callback with the given packed PCM.
    pub fn fire(&self, pcm: &[u8]) {
        if let Some(cb) = self.callback.lock().unwrap().as_mut() {
            cb(pcm);
        }
    }

    pub fn has_callback(&self) -> bool {
        self.callback.lock().unwrap().is_some()
    }
}

/// Capture backend backed by a [`CaptureHarness`].
#[derive(Default)]
pub struct FakeCapture {
    pub fail_open: bool,
    shared: Arc<CaptureHarness>,
}

impl FakeCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn harness(&self) -> Arc<CaptureHarness> {
        Arc::clone(&self.shared)
    }
}

impl CaptureBackend for FakeCapture {
    fn open_stream(
        &mut self,
        _spec: CaptureSpec,
        on_data: CaptureDataCallback,
    ) -> Result<Box<dyn CaptureStream>, BackendError> {
        if self.fail_open {
            return Err(BackendError("fake capture device missing".into()));
        }
        *self.shared.callback.lock().unwrap() = Some(on_data);
        self.shared.started.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeCaptureStream {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct FakeCaptureStream {
    shared: Arc<CaptureHarness>,
}

impl CaptureStream for FakeCaptureStream {
    fn stop(&mut self) {
        self.shared.callback.lock().unwrap().take();
        self.shared.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Build an in-memory WAV blob: a 440 Hz tone at half amplitude.
pub fn wav_blob(secs: f64, sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
    let frames = (secs * f64::from(sample_rate)) as usize;
    for n in 0..frames {
        let t = n as f64 / f64::from(sample_rate);
        let sample = (0.5 * (t * 440.0 * std::f64::consts::TAU).sin() * 32767.0) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();

    cursor.into_inner()
}

/// Pack i16 samples as little-endian bytes.
pub fn s16_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
