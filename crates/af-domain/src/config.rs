use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Warning => "warning",
            ConfigSeverity::Error => "error",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

impl Config {
    /// Validate cross-field constraints not expressible via serde defaults.
    ///
    /// Warnings are logged by the caller and startup proceeds; errors
    /// abort startup.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.cache.max_handles == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "cache.max_handles must be >= 1".into(),
            });
        }
        if self.cache.idle_secs == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "cache.idle_secs is 0 — every sweep will evict every handle".into(),
            });
        }
        if self.store.adapter_bucket.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "store.adapter_bucket is empty".into(),
            });
        }
        if self.generation.num_beams == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "generation.num_beams must be >= 1".into(),
            });
        }
        issues
    }
}

pub use crate::config::cache::CacheConfig;
pub use crate::config::generation::{Dtype, GenerationConfig};
pub use crate::config::observability::ObservabilityConfig;
pub use crate::config::server::{CorsConfig, ServerConfig};
pub use crate::config::store::{BlobLayout, ObjectStoreImpl, StoreConfig};

pub mod cache;
pub mod generation;
pub mod observability;
pub mod server;
pub mod store;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates_clean() {
        let cfg = Config::default();
        let issues: Vec<_> = cfg
            .validate()
            .into_iter()
            .filter(|i| matches!(i.severity, ConfigSeverity::Error))
            .collect();
        assert!(issues.is_empty());
    }

    #[test]
    fn zero_max_handles_is_an_error() {
        let mut cfg = Config::default();
        cfg.cache.max_handles = 0;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i.severity, ConfigSeverity::Error)));
    }
}
