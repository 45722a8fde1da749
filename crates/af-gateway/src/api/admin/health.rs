//! Health, metrics, and debug endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

use super::guard::AdminGuard;

/// GET /health — liveness probe, no auth.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /metrics — Prometheus text exposition, no auth.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let loaded = state.orchestrator.cache().len();
    let active = state.sessions.active_users();
    let body = state.metrics.render(loaded, active);
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

/// GET /admin/models — every loaded handle (admin-gated).
pub async fn admin_models(_guard: AdminGuard, State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.orchestrator.cache().snapshot();
    let models: Vec<_> = snapshot
        .into_iter()
        .map(|(user_id, handle_state, version, bundle_dir)| {
            serde_json::json!({
                "user_id": user_id,
                "state": handle_state.to_string(),
                "version": version,
                "bundle_dir": bundle_dir,
            })
        })
        .collect();
    Json(serde_json::json!({
        "models": models,
        "count": models.len(),
        "config_path": state.config_path.display().to_string(),
    }))
}

/// POST /admin/restart — trigger graceful server shutdown (admin-gated).
///
/// Wakes the `with_graceful_shutdown` future in `main.rs`; the actual
/// process restart is left to a process manager (systemd, k8s) watching
/// the exit.
pub async fn admin_restart(_guard: AdminGuard, State(state): State<AppState>) -> impl IntoResponse {
    tracing::info!("restart requested via admin API");
    state.shutdown_tx.notify_one();
    Json(serde_json::json!({
        "restarting": true,
        "note": "server will shut down gracefully — a process manager is expected to restart it",
    }))
}

/// GET /admin/debug/{user_id} — debug view of one handle (admin-gated).
pub async fn admin_debug_user(
    _guard: AdminGuard,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.cache().get(&user_id) {
        Some(handle) => {
            let handle_id = format!("{:p}", std::sync::Arc::as_ptr(&handle));
            Json(serde_json::json!({
                "user_id": handle.user_id,
                "handle_id": handle_id,
                "source": handle.source(),
                "state": handle.state.to_string(),
                "version": handle.version,
                "bundle_dir": handle.bundle_path.as_ref().map(|p| p.display().to_string()),
                "idle_secs": handle.idle_for().as_secs(),
            }))
            .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "no loaded handle for user" })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_cache::handle::Handle;
    use af_cache::BoundedCache;
    use af_domain::backend::ModelRef;
    use af_domain::config::{Config, StoreConfig};
    use std::sync::Arc;

    async fn test_state() -> AppState {
        let blob_root = tempfile::tempdir().unwrap();
        let store_cfg = StoreConfig {
            adapters_root: blob_root.path().to_path_buf(),
            scratch_root: blob_root.path().to_path_buf(),
            ..StoreConfig::default()
        };
        let blob_source = af_blobstore::build_blob_source(&store_cfg).unwrap();
        let backend: Arc<dyn af_domain::backend::InferenceBackend> =
            Arc::new(crate::inference::LocalEchoBackend::new(512));
        let base = Arc::new(Handle::base(ModelRef(Arc::from("base"))));
        let cache = BoundedCache::new(4, 1_000_000, store_cfg.scratch_root.clone());
        let orchestrator = Arc::new(crate::orchestrator::ModelOrchestrator::new(
            cache,
            blob_source.clone(),
            backend.clone(),
            base,
        ));
        AppState {
            config: Arc::new(Config::default()),
            backend,
            blob_source,
            orchestrator,
            metrics: Arc::new(crate::observability::Metrics::new()),
            sessions: Arc::new(crate::observability::SessionRegistry::new()),
            config_path: "config.toml".into(),
            admin_token_hash: None,
            shutdown_tx: Arc::new(tokio::sync::Notify::new()),
        }
    }

    #[tokio::test]
    async fn debug_user_404s_when_no_handle_loaded() {
        let state = test_state().await;
        let response = admin_debug_user(
            AdminGuard,
            State(state),
            Path("nobody".to_string()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn debug_user_returns_handle_once_loaded() {
        let state = test_state().await;
        let handle = Arc::new(Handle::fallback(
            "alice".into(),
            ModelRef(Arc::from("base")),
            None,
        ));
        state.orchestrator.cache().put("alice".into(), handle);
        let response = admin_debug_user(
            AdminGuard,
            State(state),
            Path("alice".to_string()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_prometheus_text() {
        let state = test_state().await;
        let response = metrics(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
