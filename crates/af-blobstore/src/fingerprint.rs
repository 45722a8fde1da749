use crate::traits::BlobMeta;
use sha2::{Digest, Sha256};

/// Fold a set of blobs into a single hex version tag.
///
/// Blobs are hashed in key-sorted order so that the result is independent
/// of listing order, which object stores do not generally guarantee.
pub fn fold(mut blobs: Vec<BlobMeta>) -> String {
    blobs.sort_by(|a, b| a.key.cmp(&b.key));
    let mut hasher = Sha256::new();
    for blob in &blobs {
        hasher.update(blob.fingerprint_token().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(key: &str, etag: Option<&str>, mtime: i64, size: u64) -> BlobMeta {
        BlobMeta {
            key: key.into(),
            etag: etag.map(|s| s.into()),
            mtime_secs: mtime,
            size,
        }
    }

    #[test]
    fn order_independent() {
        let a = fold(vec![blob("b", None, 1, 10), blob("a", None, 1, 20)]);
        let b = fold(vec![blob("a", None, 1, 20), blob("b", None, 1, 10)]);
        assert_eq!(a, b);
    }

    #[test]
    fn size_change_changes_tag() {
        let a = fold(vec![blob("a", None, 1, 10)]);
        let b = fold(vec![blob("a", None, 1, 11)]);
        assert_ne!(a, b);
    }

    #[test]
    fn etag_preferred_over_mtime() {
        let a = fold(vec![blob("a", Some("\"xyz\""), 1, 10)]);
        let b = fold(vec![blob("a", Some("\"xyz\""), 999, 10)]);
        assert_eq!(a, b, "etag should dominate mtime when present");
    }

    #[test]
    fn empty_set_is_stable() {
        let a = fold(vec![]);
        let b = fold(vec![]);
        assert_eq!(a, b);
    }
}
