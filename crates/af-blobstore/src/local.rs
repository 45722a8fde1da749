use crate::fingerprint;
use crate::retry::with_retry;
use crate::traits::{BlobMeta, BlobSource};
use af_domain::config::BlobLayout;
use af_domain::error::{Error, Result};
use af_domain::model::{UserId, VersionTag};
use std::path::PathBuf;
use uuid::Uuid;

/// Mirrors the shared-bucket / bucket-per-user layouts as plain
/// directories on disk.
pub struct LocalBlobSource {
    root: PathBuf,
    scratch_root: PathBuf,
    layout: BlobLayout,
}

impl LocalBlobSource {
    pub fn new(root: PathBuf, scratch_root: PathBuf, layout: BlobLayout) -> Self {
        Self {
            root,
            scratch_root,
            layout,
        }
    }

    fn user_dir(&self, user_id: &UserId) -> PathBuf {
        match self.layout {
            BlobLayout::SharedBucket => self.root.join(user_id),
            BlobLayout::BucketPerUser => self.root.join(user_id),
        }
    }

    fn list_blobs(&self, user_id: &UserId) -> Result<Vec<(PathBuf, BlobMeta)>> {
        let dir = self.user_dir(user_id);
        if !dir.is_dir() {
            return Err(Error::NoBundle(user_id.clone()));
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let meta = entry.metadata()?;
            let mtime_secs = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            let key = entry.file_name().to_string_lossy().into_owned();
            out.push((
                entry.path(),
                BlobMeta {
                    key,
                    etag: None,
                    mtime_secs,
                    size: meta.len(),
                },
            ));
        }
        if out.is_empty() {
            return Err(Error::NoBundle(user_id.clone()));
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl BlobSource for LocalBlobSource {
    async fn version(&self, user_id: &UserId) -> Result<VersionTag> {
        let blobs = with_retry(|| async { self.list_blobs(user_id) }).await?;
        let metas = blobs.into_iter().map(|(_, m)| m).collect();
        Ok(fingerprint::fold(metas))
    }

    async fn materialize(&self, user_id: &UserId, version: &VersionTag) -> Result<PathBuf> {
        let blobs = with_retry(|| async { self.list_blobs(user_id) }).await?;
        std::fs::create_dir_all(&self.scratch_root)?;
        let short = &version[..version.len().min(8)];
        let dest = self.scratch_root.join(format!(
            "{}_{}_{}",
            sanitize(user_id),
            short,
            Uuid::new_v4().simple()
        ));
        std::fs::create_dir_all(&dest)?;
        for (path, meta) in blobs {
            std::fs::copy(&path, dest.join(&meta.key))?;
        }
        Ok(dest)
    }
}

fn sanitize(user_id: &str) -> String {
    user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
