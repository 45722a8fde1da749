pub mod config;

use clap::{Parser, Subcommand};

/// adaptforge — a per-user adapter composition and serving gateway.
#[derive(Debug, Parser)]
#[command(name = "adaptforge", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `AF_CONFIG` (or
/// `config.toml` by default), then apply field-by-field environment
/// overrides on top — mirroring the original's fully `os.getenv`-driven
/// settings, where the environment always wins over the file.
/// Returns the parsed [`Config`] and the path that was used.
pub fn load_config() -> anyhow::Result<(af_domain::config::Config, String)> {
    let config_path = std::env::var("AF_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let mut config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        af_domain::config::Config::default()
    };

    apply_env_overrides(&mut config)?;

    Ok((config, config_path))
}

/// Overrides `config`'s fields from the environment, one variable per
/// field. A variable that is unset or absent leaves the existing
/// (file or default) value untouched; a variable that is set but fails
/// to parse is reported as an error rather than silently ignored.
fn apply_env_overrides(config: &mut af_domain::config::Config) -> anyhow::Result<()> {
    use af_domain::config::{BlobLayout, Dtype, ObjectStoreImpl};

    if let Some(v) = env_parsed("MAX_HANDLES")? {
        config.cache.max_handles = v;
    }
    if let Some(v) = env_parsed("IDLE_SECS")? {
        config.cache.idle_secs = v;
    }
    if let Some(v) = env_str("OBJECT_STORE_IMPL") {
        config.store.object_store_impl = match v.as_str() {
            "local" => ObjectStoreImpl::Local,
            "s3" => ObjectStoreImpl::S3,
            "minio" => ObjectStoreImpl::Minio,
            other => anyhow::bail!("OBJECT_STORE_IMPL: unknown value {other:?}"),
        };
    }
    if let Some(v) = env_str("OBJECT_STORE_URL") {
        config.store.object_store_url = Some(v);
    }
    if let Some(v) = env_str("ADAPTER_BUCKET") {
        config.store.adapter_bucket = v;
    }
    if let Some(v) = env_str("LORA_LAYOUT") {
        config.store.layout = match v.as_str() {
            "shared_bucket" | "single_bucket" => BlobLayout::SharedBucket,
            "bucket_per_user" => BlobLayout::BucketPerUser,
            other => anyhow::bail!("LORA_LAYOUT: unknown value {other:?}"),
        };
    }
    if let Some(v) = env_str("FULL_MODEL_DIR") {
        config.store.full_model_dir = v.into();
    }
    if let Some(v) = env_str("ADAPTERS_ROOT") {
        config.store.adapters_root = v.into();
    }
    if let Some(v) = env_str("SCRATCH_ROOT") {
        config.store.scratch_root = v.into();
    }
    if let Some(v) = env_parsed("NUM_BEAMS")? {
        config.generation.num_beams = v;
    }
    if let Some(v) = env_parsed("NO_REPEAT_NGRAM")? {
        config.generation.no_repeat_ngram = v;
    }
    if let Some(v) = env_parsed("LENGTH_PENALTY")? {
        config.generation.length_penalty = v;
    }
    if let Some(v) = env_parsed("EARLY_STOPPING")? {
        config.generation.early_stopping = v;
    }
    if let Some(v) = env_str("DTYPE") {
        config.generation.dtype = match v.as_str() {
            "float16" => Dtype::Float16,
            "bfloat16" => Dtype::Bfloat16,
            "float32" => Dtype::Float32,
            other => anyhow::bail!("DTYPE: unknown value {other:?}"),
        };
    }
    if let Some(v) = env_str("SERVER_HOST") {
        config.server.host = v;
    }
    if let Some(v) = env_parsed("SERVER_PORT")? {
        config.server.port = v;
    }

    Ok(())
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> anyhow::Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_str(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{key}: invalid value {raw:?}: {e}")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_domain::config::{BlobLayout, Config, Dtype, ObjectStoreImpl};

    /// Serializes access to the process environment across tests in this
    /// module so parallel test threads don't clobber each other's vars.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap();
        for (k, v) in vars {
            std::env::set_var(k, v);
        }
        f();
        for (k, _) in vars {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn overrides_scalar_fields() {
        with_env(
            &[
                ("MAX_HANDLES", "16"),
                ("IDLE_SECS", "60"),
                ("SERVER_HOST", "0.0.0.0"),
                ("SERVER_PORT", "9000"),
                ("ADAPTER_BUCKET", "my-bucket"),
            ],
            || {
                let mut config = Config::default();
                apply_env_overrides(&mut config).unwrap();
                assert_eq!(config.cache.max_handles, 16);
                assert_eq!(config.cache.idle_secs, 60);
                assert_eq!(config.server.host, "0.0.0.0");
                assert_eq!(config.server.port, 9000);
                assert_eq!(config.store.adapter_bucket, "my-bucket");
            },
        );
    }

    #[test]
    fn overrides_enum_fields() {
        with_env(
            &[
                ("OBJECT_STORE_IMPL", "minio"),
                ("LORA_LAYOUT", "bucket_per_user"),
                ("DTYPE", "float32"),
            ],
            || {
                let mut config = Config::default();
                apply_env_overrides(&mut config).unwrap();
                assert_eq!(config.store.object_store_impl, ObjectStoreImpl::Minio);
                assert_eq!(config.store.layout, BlobLayout::BucketPerUser);
                assert_eq!(config.generation.dtype, Dtype::Float32);
            },
        );
    }

    #[test]
    fn unset_vars_leave_defaults_untouched() {
        let mut config = Config::default();
        let before = config.cache.max_handles;
        apply_env_overrides(&mut config).unwrap();
        assert_eq!(config.cache.max_handles, before);
    }

    #[test]
    fn invalid_enum_value_is_an_error() {
        with_env(&[("OBJECT_STORE_IMPL", "bogus")], || {
            let mut config = Config::default();
            assert!(apply_env_overrides(&mut config).is_err());
        });
    }

    #[test]
    fn invalid_numeric_value_is_an_error() {
        with_env(&[("MAX_HANDLES", "not-a-number")], || {
            let mut config = Config::default();
            assert!(apply_env_overrides(&mut config).is_err());
        });
    }
}
