pub mod fingerprint;
pub mod local;
pub mod normalizer;
pub mod remote;
pub mod retry;
pub mod traits;

use af_domain::config::{ObjectStoreImpl, StoreConfig};
use af_domain::error::Result;
use std::sync::Arc;

pub use local::LocalBlobSource;
pub use remote::RemoteBlobSource;
pub use traits::{BlobMeta, BlobSource};

/// Construct the active blob source for the configured backend.
pub fn build_blob_source(config: &StoreConfig) -> Result<Arc<dyn BlobSource>> {
    match config.object_store_impl {
        ObjectStoreImpl::Local => Ok(Arc::new(LocalBlobSource::new(
            config.adapters_root.clone(),
            config.scratch_root.clone(),
            config.layout,
        ))),
        ObjectStoreImpl::S3 | ObjectStoreImpl::Minio => {
            Ok(Arc::new(RemoteBlobSource::from_config(config)?))
        }
    }
}
