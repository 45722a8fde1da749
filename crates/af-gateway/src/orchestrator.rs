//! The model orchestrator: owns the base model and the bounded cache,
//! and implements the get/offload/refresh/sweep protocol.

use crate::observability::Metrics;
use crate::runtime::composition_lock::CompositionLockMap;
use af_blobstore::BlobSource;
use af_domain::backend::InferenceBackend;
use af_domain::error::Result;
use af_domain::model::UserId;
use af_domain::trace::TraceEvent;
use af_cache::handle::Handle;
use af_cache::BoundedCache;
use std::sync::Arc;
use std::time::Instant;

pub struct ModelOrchestrator {
    cache: BoundedCache,
    blob_source: Arc<dyn BlobSource>,
    backend: Arc<dyn InferenceBackend>,
    base: Arc<Handle>,
    composition_locks: CompositionLockMap,
    metrics: Option<Arc<Metrics>>,
}

impl ModelOrchestrator {
    pub fn new(
        cache: BoundedCache,
        blob_source: Arc<dyn BlobSource>,
        backend: Arc<dyn InferenceBackend>,
        base: Arc<Handle>,
    ) -> Self {
        Self {
            cache,
            blob_source,
            backend,
            base,
            composition_locks: CompositionLockMap::new(),
            metrics: None,
        }
    }

    /// Attaches the counters this orchestrator should report composition,
    /// fallback, and eviction events to.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn cache(&self) -> &BoundedCache {
        &self.cache
    }

    pub fn base_handle(&self) -> Arc<Handle> {
        self.base.clone()
    }

    /// Returns the ready-to-serve handle for `user_id`, composing or
    /// recomposing as necessary. Never fails: composition failures
    /// degrade to the base model via a `Fallback` handle.
    pub async fn get(&self, user_id: &UserId) -> Arc<Handle> {
        // Every `get` re-checks the remote version under the per-user
        // composition lock; a cache hit alone is not enough, since a
        // stale bundle would otherwise be served forever.
        let _permit = self.composition_locks.acquire(user_id).await;

        // Re-check after acquiring the lock: another caller may have
        // just finished composing for us.
        let cached = self.cache.get(user_id);

        let remote_version = self.blob_source.version(user_id).await;

        match (cached, remote_version) {
            (Some(handle), Ok(tag)) if handle.version.as_deref() == Some(tag.as_str()) => {
                TraceEvent::VersionChecked {
                    user_id: user_id.clone(),
                    tag,
                    changed: false,
                }
                .emit();
                handle
            }
            (_, Ok(tag)) => {
                TraceEvent::VersionChecked {
                    user_id: user_id.clone(),
                    tag: tag.clone(),
                    changed: true,
                }
                .emit();
                self.compose_and_install(user_id, &tag).await
            }
            (Some(handle), Err(_)) => {
                // Bundle vanished or store unreachable; keep serving the
                // handle we already have rather than degrade a working user.
                handle
            }
            (None, Err(e)) => {
                TraceEvent::Fallback {
                    user_id: user_id.clone(),
                    reason: e.to_string(),
                }
                .emit();
                if let Some(m) = &self.metrics {
                    m.record_fallback();
                }
                let handle = Arc::new(Handle::fallback(
                    user_id.clone(),
                    self.base.model_ref.clone(),
                    None,
                ));
                self.cache.put(user_id.clone(), handle.clone());
                handle
            }
        }
    }

    async fn compose_and_install(&self, user_id: &UserId, version: &str) -> Arc<Handle> {
        let started = Instant::now();
        let handle = match self.try_compose(user_id, version).await {
            Ok(handle) => {
                TraceEvent::Composed {
                    user_id: user_id.clone(),
                    version: version.to_string(),
                    duration_ms: started.elapsed().as_millis() as u64,
                }
                .emit();
                if let Some(m) = &self.metrics {
                    m.record_composition();
                }
                handle
            }
            Err(e) => {
                TraceEvent::Fallback {
                    user_id: user_id.clone(),
                    reason: e.to_string(),
                }
                .emit();
                if let Some(m) = &self.metrics {
                    m.record_fallback();
                }
                Handle::fallback(user_id.clone(), self.base.model_ref.clone(), Some(version.to_string()))
            }
        };
        let handle = Arc::new(handle);
        self.cache.put(user_id.clone(), handle.clone());
        handle
    }

    async fn try_compose(&self, user_id: &UserId, version: &str) -> Result<Handle> {
        let bundle_dir = self.blob_source.materialize(user_id, &version.to_string()).await?;
        TraceEvent::BundleMaterialized {
            user_id: user_id.clone(),
            version: version.to_string(),
            bundle_dir: bundle_dir.display().to_string(),
            object_count: std::fs::read_dir(&bundle_dir).map(|d| d.count()).unwrap_or(0),
        }
        .emit();
        let descriptor = af_blobstore::normalizer::normalize(&bundle_dir)?.unwrap_or_default();
        let model_ref = self.backend.compose(&bundle_dir, &descriptor).await?;
        Ok(Handle::composed(user_id.clone(), model_ref, bundle_dir, version.to_string()))
    }

    /// Removes and releases the user's handle. Idempotent.
    pub fn offload(&self, user_id: &UserId) {
        if self.cache.evict(user_id).is_some() {
            TraceEvent::Offloaded {
                user_id: user_id.clone(),
            }
            .emit();
            if let Some(m) = &self.metrics {
                m.record_evictions(1);
            }
        }
    }

    /// Forces a version re-check and recomposition. Concurrent refreshes
    /// for the same user coalesce through the composition lock.
    pub async fn refresh(&self, user_id: &UserId) -> Arc<Handle> {
        self.offload(user_id);
        self.get(user_id).await
    }

    /// Runs one idle-eviction pass over the cache, and drops any
    /// composition lock with no in-flight composition so the map doesn't
    /// grow by one entry per distinct user forever.
    pub fn sweep(&self) {
        let evicted = self.cache.sweep_idle();
        if !evicted.is_empty() {
            tracing::debug!(count = evicted.len(), "idle sweep evicted handles");
            if let Some(m) = &self.metrics {
                m.record_evictions(evicted.len());
            }
        }
        self.composition_locks.prune_idle();
    }
}
