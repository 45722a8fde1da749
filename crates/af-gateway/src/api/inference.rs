//! Per-user inference task handlers: summarize, categorize, suggest, and
//! the model lifecycle endpoints (onload/offload/refresh).

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use af_domain::backend::DecodingParams;
use af_domain::error::Error;
use af_domain::model::BASE_SENTINEL;
use af_cache::handle::Handle;

use crate::state::AppState;

const USER_HEADER: &str = "x-user-id";

/// Local wrapper so the inference handlers can turn a domain [`Error`]
/// directly into a response without implementing a foreign trait for a
/// foreign type.
#[derive(Debug)]
struct ApiError(Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::MissingUserHeader => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NoBundle(_) | Error::BadMetadata(_) => StatusCode::NOT_FOUND,
            Error::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Extracts and validates the caller's user id from the `x-user-id`
/// header. Rejects both a missing/empty header and the reserved base
/// sentinel, which must never be reachable from the public surface.
fn extract_user_id(headers: &HeaderMap) -> Result<String, ApiError> {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(Error::MissingUserHeader)
        .map_err(ApiError)?;
    if user_id == BASE_SENTINEL {
        return Err(ApiError(Error::Config(format!(
            "user id {BASE_SENTINEL} is reserved"
        ))));
    }
    Ok(user_id.to_string())
}

#[derive(Debug, Deserialize)]
pub struct ThreadRequest {
    pub threads: Vec<String>,
}

fn decoding_params(state: &AppState, max_new_tokens: u32) -> DecodingParams {
    let gen = &state.config.generation;
    DecodingParams {
        num_beams: gen.num_beams,
        no_repeat_ngram_size: gen.no_repeat_ngram,
        length_penalty: gen.length_penalty,
        early_stopping: gen.early_stopping,
        max_new_tokens,
    }
}

/// Picks the short or long summarize cap based on a single thread's length,
/// so a quick reply doesn't pay the long-form budget.
fn summarize_cap(state: &AppState, thread: &str) -> u32 {
    let caps = &state.config.generation.task_caps;
    if thread.len() > 2_000 {
        caps.summarize_long
    } else {
        caps.summarize_short
    }
}

/// Runs one generation per thread against the user's handle, returning the
/// parsed result for each. A per-thread failure is reported in the
/// response array rather than failing the whole request. Token counts
/// come straight from the backend's reported `tokens`, not an
/// approximation derived from the output text.
async fn run_over_threads(
    state: &AppState,
    user_id: &str,
    route: &str,
    handle: &Handle,
    threads: &[String],
    cap_for: impl Fn(&str) -> u32,
) -> Vec<Result<String, String>> {
    let mut results = Vec::with_capacity(threads.len());
    for thread in threads {
        let cap = cap_for(thread);
        let params = decoding_params(state, cap);
        let result = crate::generate::generate(handle, state.backend.as_ref(), thread, cap, &params).await;
        match result {
            Ok((text, tokens)) => {
                state.metrics.record_tokens(user_id, route, tokens);
                results.push(Ok(text));
            }
            Err(e) => results.push(Err(e.to_string())),
        }
    }
    state
        .sessions
        .record_use(user_id, handle.version.clone(), handle.source() == "adapter");
    results
}

fn results_json(results: Vec<Result<String, String>>) -> serde_json::Value {
    serde_json::json!(results
        .into_iter()
        .map(|r| match r {
            Ok(text) => serde_json::json!({ "ok": true, "result": text }),
            Err(err) => serde_json::json!({ "ok": false, "error": err }),
        })
        .collect::<Vec<_>>())
}

/// Records the final response status for one HTTP request against a route.
fn record_request(state: &AppState, route: &str, status: StatusCode) {
    state.metrics.record_request(route, "POST", status.as_u16());
}

/// POST /summarize
pub async fn summarize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ThreadRequest>,
) -> impl IntoResponse {
    const ROUTE: &str = "/summarize";
    let user_id = match extract_user_id(&headers) {
        Ok(u) => u,
        Err(e) => {
            record_request(&state, ROUTE, e.status());
            return e.into_response();
        }
    };
    let handle = state.orchestrator.get(&user_id).await;
    let results = run_over_threads(&state, &user_id, ROUTE, &handle, &body.threads, |t| {
        summarize_cap(&state, t)
    })
    .await;
    record_request(&state, ROUTE, StatusCode::OK);
    Json(serde_json::json!({ "results": results_json(results) })).into_response()
}

/// POST /categorize
pub async fn categorize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ThreadRequest>,
) -> impl IntoResponse {
    const ROUTE: &str = "/categorize";
    let user_id = match extract_user_id(&headers) {
        Ok(u) => u,
        Err(e) => {
            record_request(&state, ROUTE, e.status());
            return e.into_response();
        }
    };
    let handle = state.orchestrator.get(&user_id).await;
    let cap = state.config.generation.task_caps.categorize;
    let results = run_over_threads(&state, &user_id, ROUTE, &handle, &body.threads, |_| cap).await;
    record_request(&state, ROUTE, StatusCode::OK);
    Json(serde_json::json!({ "results": results_json(results) })).into_response()
}

/// POST /suggest
pub async fn suggest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ThreadRequest>,
) -> impl IntoResponse {
    const ROUTE: &str = "/suggest";
    let user_id = match extract_user_id(&headers) {
        Ok(u) => u,
        Err(e) => {
            record_request(&state, ROUTE, e.status());
            return e.into_response();
        }
    };
    let handle = state.orchestrator.get(&user_id).await;
    let cap = state.config.generation.task_caps.suggest;
    let results = run_over_threads(&state, &user_id, ROUTE, &handle, &body.threads, |_| cap).await;
    record_request(&state, ROUTE, StatusCode::OK);
    Json(serde_json::json!({ "results": results_json(results) })).into_response()
}

/// POST /models/onload — eagerly composes (or falls back) for a user.
pub async fn models_onload(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    const ROUTE: &str = "/models/onload";
    let user_id = match extract_user_id(&headers) {
        Ok(u) => u,
        Err(e) => {
            record_request(&state, ROUTE, e.status());
            return e.into_response();
        }
    };
    let handle = state.orchestrator.get(&user_id).await;
    state
        .sessions
        .record_use(&user_id, handle.version.clone(), handle.source() == "adapter");
    record_request(&state, ROUTE, StatusCode::OK);
    Json(serde_json::json!({
        "source": handle.source(),
        "adapter_dir": handle.bundle_path.as_ref().map(|p| p.display().to_string()),
    }))
    .into_response()
}

/// POST /models/offload — releases a user's composed handle.
pub async fn models_offload(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    const ROUTE: &str = "/models/offload";
    let user_id = match extract_user_id(&headers) {
        Ok(u) => u,
        Err(e) => {
            record_request(&state, ROUTE, e.status());
            return e.into_response();
        }
    };
    state.orchestrator.offload(&user_id);
    state.sessions.mark_unloaded(&user_id);
    record_request(&state, ROUTE, StatusCode::OK);
    Json(serde_json::json!({ "offloaded": true })).into_response()
}

/// POST /models/refresh — forces a version re-check and recomposition.
pub async fn models_refresh(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    const ROUTE: &str = "/models/refresh";
    let user_id = match extract_user_id(&headers) {
        Ok(u) => u,
        Err(e) => {
            record_request(&state, ROUTE, e.status());
            return e.into_response();
        }
    };
    let handle = state.orchestrator.refresh(&user_id).await;
    state
        .sessions
        .record_use(&user_id, handle.version.clone(), handle.source() == "adapter");
    record_request(&state, ROUTE, StatusCode::OK);
    Json(serde_json::json!({
        "source": handle.source(),
        "version": handle.version,
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(user_id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, user_id.parse().unwrap());
        headers
    }

    #[test]
    fn rejects_missing_header() {
        let err = extract_user_id(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn rejects_empty_header() {
        let err = extract_user_id(&headers_with("")).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn rejects_base_sentinel() {
        let err = extract_user_id(&headers_with(BASE_SENTINEL)).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn accepts_ordinary_user_id() {
        assert_eq!(extract_user_id(&headers_with("alice")).unwrap(), "alice");
    }
}
