//! Request counters, generation-token counters, and the per-user session
//! registry exposed at `/metrics` and `/admin/models`.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// First-seen/last-seen/version/loaded tracking for every user the
/// orchestrator has ever served, independent of whether their handle is
/// still resident in the cache.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionRecord {
    pub user_id: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub adapter_version: Option<String>,
    pub loaded: bool,
}

#[derive(Default)]
pub struct SessionRegistry {
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_use(&self, user_id: &str, adapter_version: Option<String>, loaded: bool) {
        let now = Utc::now();
        let mut records = self.records.write();
        records
            .entry(user_id.to_string())
            .and_modify(|r| {
                r.last_seen = now;
                r.adapter_version = adapter_version.clone();
                r.loaded = loaded;
            })
            .or_insert_with(|| SessionRecord {
                user_id: user_id.to_string(),
                first_seen: now,
                last_seen: now,
                adapter_version,
                loaded,
            });
    }

    pub fn mark_unloaded(&self, user_id: &str) {
        if let Some(r) = self.records.write().get_mut(user_id) {
            r.loaded = false;
        }
    }

    pub fn get(&self, user_id: &str) -> Option<SessionRecord> {
        self.records.read().get(user_id).cloned()
    }

    pub fn list(&self) -> Vec<SessionRecord> {
        self.records.read().values().cloned().collect()
    }

    pub fn active_users(&self) -> usize {
        self.records.read().values().filter(|r| r.loaded).count()
    }
}

/// Request- and generation-scoped counters exposed as Prometheus text.
///
/// Request totals are labeled by route/method/status and token totals by
/// user/route, matching the original's labeled Prometheus counters
/// rather than flattening everything into a single aggregate.
#[derive(Default)]
pub struct Metrics {
    requests_by_label: RwLock<HashMap<(String, String, u16), u64>>,
    tokens_by_label: RwLock<HashMap<(String, String), u64>>,
    pub compositions_total: AtomicU64,
    pub fallbacks_total: AtomicU64,
    pub evictions_total: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one HTTP request against `route`/`method`/`status`.
    pub fn record_request(&self, route: &str, method: &str, status: u16) {
        let mut by_label = self.requests_by_label.write();
        *by_label
            .entry((route.to_string(), method.to_string(), status))
            .or_insert(0) += 1;
    }

    /// Records `n` generated tokens against `user_id`/`route`.
    pub fn record_tokens(&self, user_id: &str, route: &str, n: usize) {
        let mut by_label = self.tokens_by_label.write();
        *by_label
            .entry((user_id.to_string(), route.to_string()))
            .or_insert(0) += n as u64;
    }

    pub fn record_composition(&self) {
        self.compositions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, n: usize) {
        self.evictions_total.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Render as Prometheus text exposition format.
    pub fn render(&self, loaded_models: usize, active_users: usize) -> String {
        let mut out = String::new();
        let line = |out: &mut String, name: &str, help: &str, value: u64| {
            out.push_str(&format!("# HELP {name} {help}\n"));
            out.push_str(&format!("# TYPE {name} counter\n"));
            out.push_str(&format!("{name} {value}\n"));
        };

        out.push_str("# HELP adaptforge_requests_total Total HTTP requests served, by route/method/status\n");
        out.push_str("# TYPE adaptforge_requests_total counter\n");
        for ((route, method, status), count) in self.requests_by_label.read().iter() {
            out.push_str(&format!(
                "adaptforge_requests_total{{route=\"{route}\",method=\"{method}\",status=\"{status}\"}} {count}\n"
            ));
        }

        out.push_str("# HELP adaptforge_tokens_generated_total Total tokens produced by generate calls, by user/route\n");
        out.push_str("# TYPE adaptforge_tokens_generated_total counter\n");
        for ((user_id, route), count) in self.tokens_by_label.read().iter() {
            out.push_str(&format!(
                "adaptforge_tokens_generated_total{{user=\"{user_id}\",route=\"{route}\"}} {count}\n"
            ));
        }

        line(
            &mut out,
            "adaptforge_compositions_total",
            "Total successful adapter compositions",
            self.compositions_total.load(Ordering::Relaxed),
        );
        line(
            &mut out,
            "adaptforge_fallbacks_total",
            "Total requests served by the base model due to missing or failed composition",
            self.fallbacks_total.load(Ordering::Relaxed),
        );
        line(
            &mut out,
            "adaptforge_evictions_total",
            "Total handle evictions (capacity + idle)",
            self.evictions_total.load(Ordering::Relaxed),
        );
        out.push_str("# HELP adaptforge_loaded_models Currently resident composed/fallback handles\n");
        out.push_str("# TYPE adaptforge_loaded_models gauge\n");
        out.push_str(&format!("adaptforge_loaded_models {loaded_models}\n"));
        out.push_str("# HELP adaptforge_active_users Distinct users with a resident handle\n");
        out.push_str("# TYPE adaptforge_active_users gauge\n");
        out.push_str(&format!("adaptforge_active_users {active_users}\n"));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tracks_first_and_last_seen() {
        let reg = SessionRegistry::new();
        reg.record_use("alice", Some("v1".into()), true);
        let rec = reg.get("alice").unwrap();
        assert_eq!(rec.adapter_version.as_deref(), Some("v1"));
        assert!(rec.loaded);
        reg.mark_unloaded("alice");
        assert!(!reg.get("alice").unwrap().loaded);
    }

    #[test]
    fn metrics_render_includes_labeled_counters() {
        let m = Metrics::new();
        m.record_request("/summarize", "POST", 200);
        m.record_tokens("alice", "/summarize", 10);
        let text = m.render(1, 1);
        assert!(text.contains(
            "adaptforge_requests_total{route=\"/summarize\",method=\"POST\",status=\"200\"} 1"
        ));
        assert!(text.contains(
            "adaptforge_tokens_generated_total{user=\"alice\",route=\"/summarize\"} 10"
        ));
        assert!(text.contains("adaptforge_loaded_models 1"));
    }

    #[test]
    fn metrics_distinguish_labels() {
        let m = Metrics::new();
        m.record_request("/summarize", "POST", 200);
        m.record_request("/summarize", "POST", 500);
        m.record_tokens("alice", "/summarize", 5);
        m.record_tokens("bob", "/categorize", 7);
        let text = m.render(0, 0);
        assert!(text.contains(
            "adaptforge_requests_total{route=\"/summarize\",method=\"POST\",status=\"200\"} 1"
        ));
        assert!(text.contains(
            "adaptforge_requests_total{route=\"/summarize\",method=\"POST\",status=\"500\"} 1"
        ));
        assert!(text.contains(
            "adaptforge_tokens_generated_total{user=\"bob\",route=\"/categorize\"} 7"
        ));
    }
}
