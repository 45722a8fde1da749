//! AppState construction and background-task spawning extracted from `main.rs`.
//!
//! Exposes two functions so the `serve` command (and any future one-shot
//! CLI command) can boot the full runtime without duplicating wiring.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use af_blobstore::build_blob_source;
use af_cache::handle::Handle;
use af_cache::BoundedCache;
use af_domain::config::{Config, ConfigSeverity};

use crate::inference::LocalEchoBackend;
use crate::observability::{Metrics, SessionRegistry};
use crate::orchestrator::ModelOrchestrator;
use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(
    config: Arc<Config>,
    config_path: String,
    shutdown_tx: Arc<tokio::sync::Notify>,
) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Blob source ──────────────────────────────────────────────────
    let blob_source = build_blob_source(&config.store).context("constructing blob source")?;
    tracing::info!(
        backend = ?config.store.object_store_impl,
        bucket = %config.store.adapter_bucket,
        "blob source ready"
    );

    // ── Inference backend + base handle ───────────────────────────────
    let backend: Arc<dyn af_domain::backend::InferenceBackend> =
        Arc::new(LocalEchoBackend::new(backend_max_input_tokens(&config)));
    let base_ref = backend
        .load_base()
        .await
        .context("loading base model")?;
    let base = Arc::new(Handle::base(base_ref));
    tracing::info!("base model loaded");

    // ── Observability ──────────────────────────────────────────────────
    let metrics = Arc::new(Metrics::new());
    let sessions = Arc::new(SessionRegistry::new());

    // ── Bounded cache + orchestrator ──────────────────────────────────
    let cache = BoundedCache::new(
        config.cache.max_handles,
        config.cache.idle_secs,
        config.store.scratch_root.clone(),
    );
    let orchestrator = Arc::new(
        ModelOrchestrator::new(cache, blob_source.clone(), backend.clone(), base)
            .with_metrics(metrics.clone()),
    );
    tracing::info!(
        max_handles = config.cache.max_handles,
        idle_secs = config.cache.idle_secs,
        "model orchestrator ready"
    );

    // ── Admin token (read once, hash for constant-time comparison) ──
    let admin_token_hash = match std::env::var("AF_ADMIN_TOKEN") {
        Ok(token) if !token.is_empty() => {
            tracing::info!("admin bearer-token auth enabled");
            Some(Sha256::digest(token.as_bytes()).to_vec())
        }
        _ => {
            tracing::warn!("admin bearer-token auth DISABLED — set AF_ADMIN_TOKEN to enable");
            None
        }
    };

    Ok(AppState {
        config,
        backend,
        blob_source,
        orchestrator,
        metrics,
        sessions,
        config_path: PathBuf::from(config_path),
        admin_token_hash,
        shutdown_tx,
    })
}

/// Encoders differ in context window; 2048 is a conservative default for
/// the reference backend until a real one reports its own limit.
fn backend_max_input_tokens(_config: &Config) -> usize {
    2048
}

/// Spawn the long-running background tokio tasks (idle sweep).
///
/// Call this **after** [`build_app_state`] when running the HTTP server.
pub fn spawn_background_tasks(state: &AppState) {
    let orchestrator = state.orchestrator.clone();
    let sweep_interval_secs = state.config.cache.sweep_interval_secs;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(sweep_interval_secs));
        loop {
            interval.tick().await;
            orchestrator.sweep();
        }
    });
    tracing::info!(sweep_interval_secs, "idle sweeper started");
}
