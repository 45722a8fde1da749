use std::path::PathBuf;
use std::sync::Arc;

use af_blobstore::BlobSource;
use af_domain::backend::InferenceBackend;
use af_domain::config::Config;

use crate::observability::{Metrics, SessionRegistry};
use crate::orchestrator::ModelOrchestrator;

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services** — config, inference backend
/// - **Bundle management** — blob source, model orchestrator
/// - **Observability** — counters/gauges, session registry
/// - **Security** — admin bearer-token hash
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub backend: Arc<dyn InferenceBackend>,

    // ── Bundle management ────────────────────────────────────────────
    pub blob_source: Arc<dyn BlobSource>,
    pub orchestrator: Arc<ModelOrchestrator>,

    // ── Observability ─────────────────────────────────────────────────
    pub metrics: Arc<Metrics>,
    pub sessions: Arc<SessionRegistry>,

    // ── Admin & process control ──────────────────────────────────────
    pub config_path: PathBuf,
    pub admin_token_hash: Option<Vec<u8>>,
    pub shutdown_tx: Arc<tokio::sync::Notify>,
}
