use af_domain::backend::ModelRef;
use af_domain::model::HandleState;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::time::Instant;

/// The orchestrator's runtime record for one user's ready-to-serve model.
///
/// `lock` serializes `generate` calls against this specific handle; it is
/// held for the full encode-generate-decode sequence, never across a
/// composition (composition installs a brand new `Handle`).
pub struct Handle {
    pub user_id: String,
    pub model_ref: ModelRef,
    pub bundle_path: Option<PathBuf>,
    pub version: Option<String>,
    pub state: HandleState,
    pub last_used: Mutex<Instant>,
    pub lock: tokio::sync::Mutex<()>,
}

impl Handle {
    pub fn composed(user_id: String, model_ref: ModelRef, bundle_path: PathBuf, version: String) -> Self {
        Self {
            user_id,
            model_ref,
            bundle_path: Some(bundle_path),
            version: Some(version),
            state: HandleState::Composed,
            last_used: Mutex::new(Instant::now()),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn fallback(user_id: String, model_ref: ModelRef, version: Option<String>) -> Self {
        Self {
            user_id,
            model_ref,
            bundle_path: None,
            version,
            state: HandleState::Fallback,
            last_used: Mutex::new(Instant::now()),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn base(model_ref: ModelRef) -> Self {
        Self {
            user_id: af_domain::model::BASE_SENTINEL.to_string(),
            model_ref,
            bundle_path: None,
            version: None,
            state: HandleState::Fallback,
            last_used: Mutex::new(Instant::now()),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.last_used.lock().elapsed()
    }

    pub fn source(&self) -> &'static str {
        match self.state {
            HandleState::Composed => "adapter",
            HandleState::Fallback => "base",
            HandleState::Released => "released",
        }
    }
}

/// Best-effort release of a handle's resources: drops the model
/// reference and removes the scratch-owned bundle directory, if any.
///
/// Only removes `bundle_path` when it lies under `scratch_root` — a
/// handle whose bundle lives outside the scratch area (e.g. a
/// persistent, non-materialized mount) must never be deleted on
/// release. Errors while removing the directory are logged and
/// swallowed.
pub fn release(handle: &Handle, scratch_root: &std::path::Path) {
    if let Some(dir) = &handle.bundle_path {
        if !dir.starts_with(scratch_root) {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(dir = %dir.display(), error = %e, "failed to remove bundle directory on release");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_ref(id: &str) -> ModelRef {
        ModelRef(std::sync::Arc::from(id))
    }

    #[test]
    fn release_removes_bundle_directory_under_scratch_root() {
        let scratch = tempfile::tempdir().unwrap();
        let bundle = scratch.path().join("alice-bundle");
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::write(bundle.join("adapter_model.bin"), "weights").unwrap();

        let handle = Handle::composed("alice".into(), model_ref("composed"), bundle.clone(), "v1".into());
        assert!(bundle.exists());
        release(&handle, scratch.path());
        assert!(!bundle.exists());
    }

    #[test]
    fn release_leaves_bundle_outside_scratch_root_untouched() {
        let persistent = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let bundle = persistent.path().join("bob-bundle");
        std::fs::create_dir_all(&bundle).unwrap();

        let handle = Handle::composed("bob".into(), model_ref("composed"), bundle.clone(), "v1".into());
        release(&handle, scratch.path());
        assert!(bundle.exists());
    }

    #[test]
    fn release_on_fallback_handle_is_a_noop() {
        let scratch = tempfile::tempdir().unwrap();
        let handle = Handle::fallback("bob".into(), model_ref("base"), None);
        release(&handle, scratch.path()); // no bundle_path; must not panic
    }

    #[test]
    fn base_handle_reports_fallback_source() {
        let handle = Handle::base(model_ref("base"));
        assert_eq!(handle.user_id, af_domain::model::BASE_SENTINEL);
        assert_eq!(handle.source(), "base");
    }

    #[test]
    fn touch_resets_idle_timer() {
        let handle = Handle::fallback("carol".into(), model_ref("base"), None);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let before = handle.idle_for();
        handle.touch();
        assert!(handle.idle_for() < before);
    }
}
