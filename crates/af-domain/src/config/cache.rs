use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Bounded cache
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of non-base composed handles kept resident.
    #[serde(default = "d_max_handles")]
    pub max_handles: usize,
    /// Seconds of inactivity after which a handle is idle-evicted.
    #[serde(default = "d_idle_secs")]
    pub idle_secs: u64,
    /// Cadence, in seconds, of the background idle sweep.
    #[serde(default = "d_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_handles: d_max_handles(),
            idle_secs: d_idle_secs(),
            sweep_interval_secs: d_sweep_interval_secs(),
        }
    }
}

fn d_max_handles() -> usize {
    8
}
fn d_idle_secs() -> u64 {
    1200
}
fn d_sweep_interval_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = CacheConfig::default();
        assert_eq!(cfg.max_handles, 8);
        assert_eq!(cfg.idle_secs, 1200);
        assert_eq!(cfg.sweep_interval_secs, 30);
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: CacheConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.max_handles, 8);
    }
}
