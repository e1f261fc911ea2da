//! Playback engine: submission pipeline, master volume, lifecycle.

pub mod request;

pub(crate) mod registry;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::backend::{EndOfStreamHook, PlaybackBackend};
use crate::decoder;

use self::registry::PlaybackRegistry;
use self::request::{AudioRequest, PlaybackRequest};

/// Asynchronous playback of in-memory encoded audio blobs.
///
/// Submissions are decoded synchronously on the caller thread and then
/// play on device-owned streams; the engine tracks every outstanding
/// request in a registry until natural end or cancellation.
pub struct PlaybackEngine {
    backend: Box<dyn PlaybackBackend>,
    registry: Arc<PlaybackRegistry>,
    teardown_tx: Option<Sender<Arc<PlaybackRequest>>>,
    teardown_thread: Option<JoinHandle<()>>,
    /// Master volume as an unscaled fraction (f32 bits); sounds read it
    /// live from their output callbacks.
    volume_fraction: Arc<AtomicU32>,
    inited: AtomicBool,
}

impl PlaybackEngine {
    pub fn new(backend: Box<dyn PlaybackBackend>) -> Self {
        let registry = Arc::new(PlaybackRegistry::new());

        let (teardown_tx, teardown_rx) = unbounded::<Arc<PlaybackRequest>>();
        let teardown_thread = thread::spawn(move || teardown_loop(&teardown_rx));

        Self {
            backend,
            registry,
            teardown_tx: Some(teardown_tx),
            teardown_thread: Some(teardown_thread),
            volume_fraction: Arc::new(AtomicU32::new(1.0f32.to_bits())),
            inited: AtomicBool::new(false),
        }
    }

    /// Open the playback device. Idempotent-on-success; returns `false`
    /// when the device layer fails to come up.
    pub fn init(&mut self) -> bool {
        if self.inited.load(Ordering::Acquire) {
            return true;
        }

        match self.backend.open() {
            Ok(()) => {
                self.inited.store(true, Ordering::Release);
                log::info!("playback initialised");
                true
            }
            Err(e) => {
                log::error!("playback init failed: {e}");
                false
            }
        }
    }

    /// Cancel everything outstanding, then tear the device down.
    /// Idempotent.
    pub fn uninit(&mut self) {
        if !self.inited.load(Ordering::Acquire) {
            return;
        }

        self.registry.cancel_and_remove_all();
        self.backend.close();
        self.inited.store(false, Ordering::Release);
        log::info!("playback uninitialised");
    }

    /// Submit an encoded blob for playback.
    ///
    /// Returns an invalid handle when the engine is down or any setup
    /// step fails; a failed request is cancelled and unregistered before
    /// this returns.
    pub fn submit(&self, data: &[u8]) -> AudioRequest {
        if !self.inited.load(Ordering::Acquire) {
            log::warn!("submission rejected: playback not initialised");
            return AudioRequest::invalid();
        }

        let request = self.registry.create(data.to_vec());

        // The decoder consumes its source, so it reads from the
        // request's own copy of the submission.
        let copied = request.state().data.clone();
        let decoded = match decoder::decode_bytes(copied) {
            Ok(audio) => Arc::new(audio),
            Err(e) => {
                log::error!("submission rejected: {e}");
                request.cancel(false);
                request.remove_from_registry();
                return AudioRequest::invalid();
            }
        };

        let Some(teardown_tx) = self.teardown_tx.clone() else {
            // Unreachable while the engine is alive; treat as a device
            // failure rather than panicking in a caller thread.
            request.cancel(false);
            request.remove_from_registry();
            return AudioRequest::invalid();
        };

        {
            // Hold the request lock across start so a very short clip's
            // end-of-stream hook cannot finish the request before the
            // sound handle is attached.
            let mut state = request.state();
            state.decoded = Some(Arc::clone(&decoded));

            let hook_request = Arc::clone(&request);
            let on_end: EndOfStreamHook = Box::new(move || {
                // Device thread: only schedule, never tear down here.
                let _ = teardown_tx.send(hook_request);
            });

            match self.backend.spawn_sound(
                decoded,
                Arc::clone(&self.volume_fraction),
                on_end,
            ) {
                Ok(sound) => state.sound = Some(sound),
                Err(e) => {
                    drop(state);
                    log::error!("failed to start sound: {e}");
                    request.cancel(false);
                    request.remove_from_registry();
                    return AudioRequest::invalid();
                }
            }
        }

        AudioRequest::valid(request)
    }

    /// Set master volume from a percent in [0, ∞); negatives clamp to 0,
    /// values above 100 amplify.
    pub fn set_volume_percent(&self, percent: f32) {
        let fraction = if percent < 0.0 { 0.0 } else { percent / 100.0 };
        self.volume_fraction
            .store(fraction.to_bits(), Ordering::Relaxed);
    }

    #[must_use]
    pub fn volume_percent(&self) -> f32 {
        f32::from_bits(self.volume_fraction.load(Ordering::Relaxed)) * 100.0
    }

    /// Cancel every outstanding request and wait for each to terminate.
    pub fn cancel_all(&self) {
        self.registry.cancel_and_remove_all();
    }

    /// Number of live (submitted, unterminated) requests.
    #[must_use]
    pub fn live_requests(&self) -> usize {
        self.registry.len()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.uninit();

        // Closing the channel ends the worker once the last in-flight
        // hook sender is gone.
        self.teardown_tx.take();
        if let Some(thread) = self.teardown_thread.take() {
            let _ = thread.join();
        }
    }
}

/// Shared teardown worker.
///
/// The device's end-of-stream hook may not tear a sound down on the
/// device thread, so it posts the request here instead; this thread
/// performs the actual cancel-with-success and registry removal.
fn teardown_loop(rx: &Receiver<Arc<PlaybackRequest>>) {
    while let Ok(request) = rx.recv() {
        request.cancel(true);
        request.remove_from_registry();
    }
}
