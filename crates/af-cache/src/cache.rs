//! Thread-safe, capacity- and idle-bounded cache of composed model handles.
//!
//! Keyed by user id behind a single lock (mirroring the map-of-entries
//! pattern of a gateway-owned session store), with LRU capacity eviction
//! via the `lru` crate and a manual idle-time sweep.

use crate::handle::{release, Handle};
use af_domain::model::UserId;
use af_domain::trace::TraceEvent;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct BoundedCache {
    entries: Mutex<LruCache<UserId, Arc<Handle>>>,
    idle_secs: u64,
    scratch_root: PathBuf,
}

impl BoundedCache {
    pub fn new(max_handles: usize, idle_secs: u64, scratch_root: PathBuf) -> Self {
        let cap = NonZeroUsize::new(max_handles.max(1)).unwrap();
        Self {
            entries: Mutex::new(LruCache::new(cap)),
            idle_secs,
            scratch_root,
        }
    }

    /// Returns the handle for `user_id` and marks it most-recently-used,
    /// without touching `last_used` (callers update that on actual use).
    pub fn get(&self, user_id: &str) -> Option<Arc<Handle>> {
        self.entries.lock().get(user_id).cloned()
    }

    /// Inserts or replaces the handle for `user_id`. If capacity is
    /// exceeded, the least-recently-used entry is evicted and released.
    pub fn put(&self, user_id: UserId, handle: Arc<Handle>) {
        let evicted = self.entries.lock().push(user_id, handle);
        if let Some((evicted_user, evicted_handle)) = evicted {
            release(&evicted_handle, &self.scratch_root);
            TraceEvent::Evicted {
                user_id: evicted_user,
                cause: "capacity",
            }
            .emit();
        }
    }

    /// Removes and releases the handle for `user_id`, if present.
    /// Idempotent: a no-op for an unknown user.
    pub fn evict(&self, user_id: &str) -> Option<Arc<Handle>> {
        let removed = self.entries.lock().pop(user_id);
        if let Some(handle) = &removed {
            release(handle, &self.scratch_root);
        }
        removed
    }

    /// Removes and releases every entry whose `last_used` predates the
    /// configured idle threshold. Returns the evicted user ids.
    pub fn sweep_idle(&self) -> Vec<UserId> {
        let threshold = Duration::from_secs(self.idle_secs);
        let stale: Vec<UserId> = {
            let entries = self.entries.lock();
            entries
                .iter()
                .filter(|(_, h)| h.idle_for() > threshold)
                .map(|(k, _)| k.clone())
                .collect()
        };
        for user_id in &stale {
            if let Some(handle) = self.entries.lock().pop(user_id) {
                release(&handle, &self.scratch_root);
                TraceEvent::Evicted {
                    user_id: user_id.clone(),
                    cause: "idle",
                }
                .emit();
            }
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries.lock().contains(user_id)
    }

    /// Snapshot of every loaded handle's user id, state, version, and
    /// bundle directory — for the admin debug surface.
    pub fn snapshot(&self) -> Vec<(UserId, af_domain::model::HandleState, Option<String>, Option<String>)> {
        self.entries
            .lock()
            .iter()
            .map(|(k, h)| {
                (
                    k.clone(),
                    h.state,
                    h.version.clone(),
                    h.bundle_path.as_ref().map(|p| p.display().to_string()),
                )
            })
            .collect()
    }
}
