use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Blob store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStoreImpl {
    Local,
    S3,
    Minio,
}

impl Default for ObjectStoreImpl {
    fn default() -> Self {
        ObjectStoreImpl::Local
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobLayout {
    SharedBucket,
    BucketPerUser,
}

impl Default for BlobLayout {
    fn default() -> Self {
        BlobLayout::SharedBucket
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub object_store_impl: ObjectStoreImpl,
    /// Endpoint URL for the s3/minio backends; ignored for `local`.
    #[serde(default)]
    pub object_store_url: Option<String>,
    #[serde(default = "d_bucket")]
    pub adapter_bucket: String,
    #[serde(default)]
    pub layout: BlobLayout,
    /// Root directory used by the `local` backend, and as the scratch
    /// root under which every materialized bundle directory is created
    /// regardless of backend.
    #[serde(default = "d_adapters_root")]
    pub adapters_root: PathBuf,
    /// Directory holding the full (non-adapted) base model weights,
    /// passed straight through to the inference backend.
    #[serde(default = "d_full_model_dir")]
    pub full_model_dir: PathBuf,
    #[serde(default = "d_scratch_root")]
    pub scratch_root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            object_store_impl: ObjectStoreImpl::default(),
            object_store_url: None,
            adapter_bucket: d_bucket(),
            layout: BlobLayout::default(),
            adapters_root: d_adapters_root(),
            full_model_dir: d_full_model_dir(),
            scratch_root: d_scratch_root(),
        }
    }
}

fn d_bucket() -> String {
    "adapters".into()
}
fn d_adapters_root() -> PathBuf {
    PathBuf::from("./data/adapters")
}
fn d_full_model_dir() -> PathBuf {
    PathBuf::from("./data/base-model")
}
fn d_scratch_root() -> PathBuf {
    PathBuf::from("./data/scratch")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_shared_bucket() {
        assert_eq!(StoreConfig::default().layout, BlobLayout::SharedBucket);
    }

    #[test]
    fn default_impl_is_local() {
        assert_eq!(
            StoreConfig::default().object_store_impl,
            ObjectStoreImpl::Local
        );
    }

    #[test]
    fn deserialize_minio_impl() {
        let cfg: StoreConfig = toml::from_str(
            r#"
            object_store_impl = "minio"
            object_store_url = "http://localhost:9000"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.object_store_impl, ObjectStoreImpl::Minio);
        assert_eq!(cfg.object_store_url.as_deref(), Some("http://localhost:9000"));
    }
}
