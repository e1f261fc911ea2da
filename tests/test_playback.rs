mod common;

use std::thread;
use std::time::Duration;

use common::{wait_until, wav_blob, FakePlayback};
use soundbox::playback::PlaybackEngine;
use soundbox::backend::CaptureBackend;
use soundbox::AudioMan;

fn engine() -> PlaybackEngine {
    let mut engine = PlaybackEngine::new(Box::new(FakePlayback::new()));
    assert!(engine.init());
    engine
}

#[test]
fn test_submit_plays_to_natural_end() {
    let mut engine = engine();

    let request = engine.submit(&wav_blob(0.1, 8_000, 1));
    assert!(request.is_valid());
    assert_eq!(engine.live_requests(), 1);

    assert!(request.wait());
    // Registry removal runs on the teardown worker just after the
    // completion is written.
    assert!(wait_until(Duration::from_secs(1), || engine.live_requests() == 0));

    engine.uninit();
}

#[test]
fn test_immediate_cancel_reports_false() {
    let mut engine = engine();

    let request = engine.submit(&wav_blob(2.0, 8_000, 1));
    assert!(request.is_valid());
    request.cancel();

    assert!(!request.wait());
    assert_eq!(engine.live_requests(), 0);

    engine.uninit();
}

#[test]
fn test_invalid_bytes_yield_invalid_handle() {
    let mut engine = engine();

    let request = engine.submit(&[0x5a; 16]);
    assert!(!request.is_valid());
    assert!(!request.wait());
    assert!(request.completion().is_none());
    assert_eq!(engine.live_requests(), 0);

    engine.uninit();
}

#[test]
fn test_submit_without_init_is_rejected() {
    let engine = PlaybackEngine::new(Box::new(FakePlayback::new()));
    assert!(!engine.submit(&wav_blob(0.1, 8_000, 1)).is_valid());
}

#[test]
fn test_init_failure_reports_false() {
    let mut engine = PlaybackEngine::new(Box::new(FakePlayback {
        fail_open: true,
        ..FakePlayback::default()
    }));
    assert!(!engine.init());
    assert!(!engine.submit(&wav_blob(0.1, 8_000, 1)).is_valid());
}

#[test]
fn test_sound_start_failure_unwinds_registration() {
    let mut engine = PlaybackEngine::new(Box::new(FakePlayback {
        fail_spawn: true,
        ..FakePlayback::default()
    }));
    assert!(engine.init());

    let request = engine.submit(&wav_blob(0.1, 8_000, 1));
    assert!(!request.is_valid());
    assert_eq!(engine.live_requests(), 0);

    engine.uninit();
}

#[test]
fn test_cancel_all_terminates_every_request() {
    let mut engine = engine();

    let a = engine.submit(&wav_blob(2.0, 8_000, 1));
    let b = engine.submit(&wav_blob(2.0, 8_000, 1));
    assert_eq!(engine.live_requests(), 2);

    engine.cancel_all();

    assert!(!a.wait());
    assert!(!b.wait());
    assert_eq!(engine.live_requests(), 0);

    engine.uninit();
}

#[test]
fn test_uninit_cancels_outstanding_requests() {
    let mut engine = engine();

    let request = engine.submit(&wav_blob(5.0, 8_000, 1));
    assert!(request.is_valid());

    engine.uninit();
    assert!(!request.wait());
    assert_eq!(engine.live_requests(), 0);

    // Down means rejected; back up means accepted again.
    assert!(!engine.submit(&wav_blob(0.1, 8_000, 1)).is_valid());
    assert!(engine.init());
    assert!(engine.submit(&wav_blob(0.1, 8_000, 1)).is_valid());
}

#[test]
fn test_completion_is_shared_by_all_readers() {
    let mut engine = engine();

    let request = engine.submit(&wav_blob(0.15, 8_000, 1));
    assert!(request.is_valid());

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let handle = request.clone();
            thread::spawn(move || handle.wait())
        })
        .collect();

    for reader in readers {
        assert!(reader.join().unwrap());
    }

    // The cell stays readable after termination.
    assert_eq!(request.completion().unwrap().try_get(), Some(true));

    engine.uninit();
}

#[test]
fn test_cancel_after_completion_is_noop() {
    let mut engine = engine();

    let request = engine.submit(&wav_blob(0.05, 8_000, 1));
    assert!(request.wait());

    request.cancel();
    // Single assignment: the outcome cannot flip to false.
    assert!(request.wait());

    engine.uninit();
}

#[test]
fn test_volume_percent_clamps_low_only() {
    let engine = PlaybackEngine::new(Box::new(FakePlayback::new()));

    assert_eq!(engine.volume_percent(), 100.0);
    engine.set_volume_percent(-10.0);
    assert_eq!(engine.volume_percent(), 0.0);
    engine.set_volume_percent(250.0);
    assert_eq!(engine.volume_percent(), 250.0);
}

/// Capture backend stub for facade construction; playback tests never
/// start recording.
struct NoCapture;

impl CaptureBackend for NoCapture {
    fn open_stream(
        &mut self,
        _spec: soundbox::backend::CaptureSpec,
        _on_data: soundbox::backend::CaptureDataCallback,
    ) -> Result<Box<dyn soundbox::backend::CaptureStream>, soundbox::backend::BackendError> {
        Err(soundbox::backend::BackendError("no capture in this test".into()))
    }
}

#[test]
fn test_facade_round_trip() {
    let mut audio = AudioMan::with_backends(Box::new(FakePlayback::new()), Box::new(NoCapture));

    assert!(audio.init_playback());
    let request = audio.submit_audio(&wav_blob(0.1, 8_000, 2));
    assert!(request.is_valid());
    assert!(request.wait());

    audio.set_playback_volume_percent(75.0);
    assert_eq!(audio.playback_volume_percent(), 75.0);

    audio.cancel_all_playback();
    audio.uninit_playback();
}
