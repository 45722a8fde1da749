//! Retry-with-backoff for blob store operations.
//!
//! Transient storage failures are retried a bounded number of times with
//! increasing delay; a missing bundle is never retried, since retrying
//! cannot make a nonexistent object appear.

use af_domain::error::{Error, Result};
use std::future::Future;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const DELAYS_MS: [u64; 2] = [1_000, 2_000];

pub async fn with_retry<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < MAX_ATTEMPTS && e.is_retriable() => {
                let delay = DELAYS_MS[(attempt - 1) as usize];
                tracing::warn!(attempt, delay_ms = delay, error = %e, "blob op failed, retrying");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_retriable_errors_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_retry(|| async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom")))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_retries_no_bundle() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::NoBundle("alice".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn io_error_is_retriable() {
        let e = Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "x"));
        assert!(e.is_retriable());
    }

    #[test]
    fn no_bundle_is_not_retriable() {
        assert!(!Error::NoBundle("x".into()).is_retriable());
    }
}
