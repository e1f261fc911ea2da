//! One submitted playback item and its completion cell.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};

use crate::backend::SoundHandle;
use crate::decoder::AudioData;

use super::registry::PlaybackRegistry;

/// One-shot, single-writer, multi-reader boolean cell bound to a
/// playback request.
///
/// `true` means the sound played to natural end; `false` means it was
/// cancelled or failed during setup. Readers block until the request
/// terminates and all observe the same value thereafter.
#[derive(Clone)]
pub struct Completion {
    cell: Arc<CompletionCell>,
}

struct CompletionCell {
    value: Mutex<Option<bool>>,
    cond: Condvar,
}

impl Completion {
    pub(crate) fn new() -> Self {
        Self {
            cell: Arc::new(CompletionCell {
                value: Mutex::new(None),
                cond: Condvar::new(),
            }),
        }
    }

    /// Block until the request terminates; returns the outcome.
    #[must_use]
    pub fn wait(&self) -> bool {
        let mut value = self.cell.value.lock().expect("completion lock poisoned");
        while value.is_none() {
            value = self.cell.cond.wait(value).expect("completion lock poisoned");
        }
        value.expect("loop exits only once written")
    }

    /// Zero-timeout peek at the outcome; `None` while still running.
    #[must_use]
    pub fn try_get(&self) -> Option<bool> {
        *self.cell.value.lock().expect("completion lock poisoned")
    }

    /// Write the outcome. Callers hold the request mutex and check the
    /// `done` latch first, so this runs at most once per cell.
    pub(crate) fn set(&self, success: bool) {
        let mut value = self.cell.value.lock().expect("completion lock poisoned");
        debug_assert!(value.is_none(), "completion cell written twice");
        *value = Some(success);
        self.cell.cond.notify_all();
    }
}

/// Teardown state of a request. After `done` flips, the sound and the
/// decoded audio are gone and no device call is issued again.
pub(crate) struct RequestState {
    /// Owned copy of the submitted encoded bytes.
    pub(crate) data: Vec<u8>,
    pub(crate) decoded: Option<Arc<AudioData>>,
    pub(crate) sound: Option<Box<dyn SoundHandle>>,
    pub(crate) done: bool,
}

/// A live playback request.
pub(crate) struct PlaybackRequest {
    id: u64,
    /// Back-reference for self-removal; weak so requests never keep the
    /// registry alive.
    registry: Weak<PlaybackRegistry>,
    state: Mutex<RequestState>,
    completion: Completion,
}

impl PlaybackRequest {
    pub(crate) fn new(id: u64, data: Vec<u8>, registry: Weak<PlaybackRegistry>) -> Self {
        Self {
            id,
            registry,
            state: Mutex::new(RequestState {
                data,
                decoded: None,
                sound: None,
                done: false,
            }),
            completion: Completion::new(),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Unregister this request. Callers invoke it only after `cancel`,
    /// never while holding the request mutex; removal is idempotent.
    pub(crate) fn remove_from_registry(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    pub(crate) fn completion(&self) -> Completion {
        self.completion.clone()
    }

    /// Lock the teardown state. Submission holds this across sound start
    /// so the end-of-stream hook cannot finish the request before the
    /// sound handle is attached.
    pub(crate) fn state(&self) -> MutexGuard<'_, RequestState> {
        self.state.lock().expect("request lock poisoned")
    }

    /// Terminate the request: tear down the sound and decoder, then
    /// write the completion cell. The first caller wins; later calls
    /// return immediately on the `done` latch.
    pub(crate) fn cancel(&self, success: bool) {
        let mut state = self.state();
        if state.done {
            return;
        }

        if let Some(mut sound) = state.sound.take() {
            sound.stop();
        }
        state.decoded = None;

        self.completion.set(success);
        state.done = true;
    }
}

/// Handle to a submitted playback request.
///
/// Clonable; every clone shares the same completion cell. An invalid
/// handle (rejected submission) reports `false` from [`wait`](Self::wait).
#[derive(Clone)]
pub struct AudioRequest {
    inner: Option<Arc<PlaybackRequest>>,
}

impl AudioRequest {
    pub(crate) fn valid(request: Arc<PlaybackRequest>) -> Self {
        Self {
            inner: Some(request),
        }
    }

    pub(crate) fn invalid() -> Self {
        Self { inner: None }
    }

    /// False when the submission was rejected during setup.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.inner.is_some()
    }

    /// Completion view, if the submission was accepted.
    #[must_use]
    pub fn completion(&self) -> Option<Completion> {
        self.inner.as_ref().map(|r| r.completion())
    }

    /// Block until the request terminates. Returns `false` for an
    /// invalid handle, a cancelled request, or a setup failure.
    #[must_use]
    pub fn wait(&self) -> bool {
        match &self.inner {
            Some(request) => request.completion().wait(),
            None => false,
        }
    }

    /// Cancel the request if it is still running; a no-op on a
    /// completed or invalid handle.
    pub fn cancel(&self) {
        if let Some(request) = &self.inner {
            if request.completion().try_get().is_none() {
                request.cancel(false);
                request.remove_from_registry();
            }
        }
    }
}
