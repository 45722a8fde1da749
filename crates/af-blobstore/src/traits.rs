use af_domain::error::Result;
use af_domain::model::{UserId, VersionTag};
use std::path::PathBuf;

/// One blob belonging to a user's adapter bundle, as seen by a backend.
#[derive(Debug, Clone)]
pub struct BlobMeta {
    /// Key relative to the user's prefix (flat — no further nesting).
    pub key: String,
    /// Remote etag, stripped of surrounding quotes, when the backend
    /// provides one; otherwise `None` (the local backend falls back to
    /// seconds-resolution mtime in `fingerprint_token`).
    pub etag: Option<String>,
    pub mtime_secs: i64,
    pub size: u64,
}

impl BlobMeta {
    /// The textual token folded into the version fingerprint for this blob.
    pub fn fingerprint_token(&self) -> String {
        let stamp = self
            .etag
            .as_deref()
            .map(|e| e.trim_matches('"').to_string())
            .unwrap_or_else(|| self.mtime_secs.to_string());
        format!("{}:{}:{}", self.key, stamp, self.size)
    }
}

/// Abstracts a user's adapter bundle as a set of named blobs, supporting
/// version fingerprinting and atomic local materialization.
///
/// Implementations exist for a local filesystem directory tree and for
/// S3/MinIO-compatible object stores via the `object_store` crate; both
/// support the shared-bucket and bucket-per-user layouts.
#[async_trait::async_trait]
pub trait BlobSource: Send + Sync {
    /// List every blob belonging to `user_id` and fold them (in
    /// key-sorted order) into a single content-derived fingerprint.
    ///
    /// Returns `Error::NoBundle` if the user has no blobs.
    async fn version(&self, user_id: &UserId) -> Result<VersionTag>;

    /// Download every blob belonging to `user_id` into a freshly created,
    /// uniquely named directory under the scratch root, flat (no nested
    /// prefixes). Returns the directory path; the caller owns its removal.
    async fn materialize(&self, user_id: &UserId, version: &VersionTag) -> Result<PathBuf>;
}
