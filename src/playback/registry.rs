//! Registry of live playback requests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::request::PlaybackRequest;

/// Ordered collection of live requests with stable integer handles.
///
/// Ids are handed out monotonically, so inserting never disturbs other
/// entries and removing invalidates only the removed id.
#[derive(Default)]
pub(crate) struct PlaybackRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    live: BTreeMap<u64, Arc<PlaybackRequest>>,
}

impl PlaybackRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a fresh request holding an owned copy of the submitted
    /// bytes. The request carries a weak back-reference for
    /// self-removal.
    pub(crate) fn create(self: &Arc<Self>, data: Vec<u8>) -> Arc<PlaybackRequest> {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;

        let request = Arc::new(PlaybackRequest::new(id, data, Arc::downgrade(self)));
        inner.live.insert(id, Arc::clone(&request));
        request
    }

    /// Drop a request by id. A no-op when the id is already gone, so the
    /// teardown worker and cancel-all can race freely.
    pub(crate) fn remove(&self, id: u64) {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .live
            .remove(&id);
    }

    /// Cancel every live request with `success = false` and wait for
    /// each one to terminate.
    pub(crate) fn cancel_and_remove_all(&self) {
        let completions: Vec<_> = {
            let mut inner = self.inner.lock().expect("registry lock poisoned");
            let completions = inner
                .live
                .values()
                .map(|request| {
                    request.cancel(false);
                    request.completion()
                })
                .collect();
            inner.live.clear();
            completions
        };

        // Outside the lock: every cell is written by the cancel above or
        // by a teardown worker that terminated the request first.
        for completion in completions {
            let _ = completion.wait();
        }
    }

    /// Number of live requests.
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().expect("registry lock poisoned").live.len()
    }
}
