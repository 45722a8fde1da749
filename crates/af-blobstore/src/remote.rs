use crate::fingerprint;
use crate::retry::with_retry;
use crate::traits::{BlobMeta, BlobSource};
use af_domain::config::{BlobLayout, ObjectStoreImpl, StoreConfig};
use af_domain::error::{Error, Result};
use af_domain::model::{UserId, VersionTag};
use futures_util::StreamExt;
use object_store::path::Path as ObjPath;
use object_store::ObjectStore;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// S3/MinIO-compatible blob source built on the `object_store` crate,
/// which presents a single async trait over any compatible backend.
pub struct RemoteBlobSource {
    store: Arc<dyn ObjectStore>,
    layout: BlobLayout,
    scratch_root: PathBuf,
}

impl RemoteBlobSource {
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let url = config
            .object_store_url
            .clone()
            .ok_or_else(|| Error::Config("store.object_store_url is required for s3/minio".into()))?;
        let store: Arc<dyn ObjectStore> = match config.object_store_impl {
            ObjectStoreImpl::S3 | ObjectStoreImpl::Minio => {
                let mut builder = object_store::aws::AmazonS3Builder::new()
                    .with_bucket_name(&config.adapter_bucket)
                    .with_endpoint(&url)
                    .with_allow_http(true);
                if let Ok(key) = std::env::var("AWS_ACCESS_KEY_ID") {
                    builder = builder.with_access_key_id(key);
                }
                if let Ok(secret) = std::env::var("AWS_SECRET_ACCESS_KEY") {
                    builder = builder.with_secret_access_key(secret);
                }
                Arc::new(
                    builder
                        .build()
                        .map_err(|e| Error::Config(format!("object store init: {e}")))?,
                )
            }
            ObjectStoreImpl::Local => {
                return Err(Error::Config(
                    "RemoteBlobSource constructed with Local impl".into(),
                ))
            }
        };
        Ok(Self {
            store,
            layout: config.layout,
            scratch_root: config.scratch_root.clone(),
        })
    }

    fn prefix(&self, user_id: &UserId) -> ObjPath {
        // The store is already scoped to `self.bucket` via
        // `with_bucket_name`, so listed keys are bucket-relative in both
        // layouts — never re-prefix with the bucket name itself.
        match self.layout {
            BlobLayout::SharedBucket => ObjPath::from(user_id.as_str()),
            BlobLayout::BucketPerUser => ObjPath::from(user_id.as_str()),
        }
    }

    async fn list(&self, user_id: &UserId) -> Result<Vec<(ObjPath, BlobMeta)>> {
        let prefix = self.prefix(user_id);
        let mut stream = self.store.list(Some(&prefix));
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            let meta = item.map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;
            let key = meta
                .location
                .as_ref()
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string();
            out.push((
                meta.location.clone(),
                BlobMeta {
                    key,
                    etag: meta.e_tag.clone(),
                    mtime_secs: meta.last_modified.timestamp(),
                    size: meta.size as u64,
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
impl BlobSource for RemoteBlobSource {
    async fn version(&self, user_id: &UserId) -> Result<VersionTag> {
        let blobs = with_retry(|| async { self.list(user_id).await }).await?;
        let metas = blobs.into_iter().map(|(_, m)| m).collect();
        Ok(fingerprint::fold(metas))
    }

    async fn materialize(&self, user_id: &UserId, version: &VersionTag) -> Result<PathBuf> {
        let blobs = with_retry(|| async { self.list(user_id).await }).await?;
        tokio::fs::create_dir_all(&self.scratch_root)
            .await
            .map_err(Error::Io)?;
        let short = &version[..version.len().min(8)];
        let dest = self.scratch_root.join(format!(
            "{}_{}_{}",
            user_id.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>(),
            short,
            Uuid::new_v4().simple()
        ));
        tokio::fs::create_dir_all(&dest).await.map_err(Error::Io)?;
        for (path, meta) in blobs {
            let get = self
                .store
                .get(&path)
                .await
                .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;
            let bytes = get
                .bytes()
                .await
                .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;
            tokio::fs::write(dest.join(&meta.key), &bytes)
                .await
                .map_err(Error::Io)?;
        }
        Ok(dest)
    }
}
