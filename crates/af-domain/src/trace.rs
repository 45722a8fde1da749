use serde::Serialize;

/// Structured trace events emitted across all adaptforge crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    VersionChecked {
        user_id: String,
        tag: String,
        changed: bool,
    },
    BundleMaterialized {
        user_id: String,
        version: String,
        bundle_dir: String,
        object_count: usize,
    },
    Composed {
        user_id: String,
        version: String,
        duration_ms: u64,
    },
    Fallback {
        user_id: String,
        reason: String,
    },
    Evicted {
        user_id: String,
        cause: &'static str,
    },
    GenerateCompleted {
        user_id: String,
        tokens: usize,
        duration_ms: u64,
    },
    Offloaded {
        user_id: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "af_event");
    }
}
