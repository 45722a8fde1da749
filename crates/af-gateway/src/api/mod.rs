pub mod admin;
pub mod inference;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// `/health` and `/metrics` are open; everything under `/admin` goes
/// through the `AdminGuard` extractor; the inference and model lifecycle
/// routes identify the caller via the `x-user-id` header rather than a
/// bearer token.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(admin::health))
        .route("/metrics", get(admin::metrics))
        .route("/admin/models", get(admin::admin_models))
        .route("/admin/debug/:user_id", get(admin::admin_debug_user))
        .route("/admin/restart", post(admin::admin_restart))
        .route("/summarize", post(inference::summarize))
        .route("/categorize", post(inference::categorize))
        .route("/suggest", post(inference::suggest))
        .route("/models/onload", post(inference::models_onload))
        .route("/models/offload", post(inference::models_offload))
        .route("/models/refresh", post(inference::models_refresh))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
