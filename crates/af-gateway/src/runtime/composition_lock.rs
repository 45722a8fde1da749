//! Per-user composition concurrency control.
//!
//! Guarantees at most one composition (version check + materialize +
//! compose) runs per user at a time. A second caller for the same user
//! waits for the in-flight composition to finish and then observes its
//! result rather than triggering a duplicate.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Maps user id to a `Semaphore(1)`. Acquiring the permit serializes
/// `get`/`refresh` composition attempts for that user.
pub struct CompositionLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for CompositionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositionLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the composition lock for a user, waiting if another
    /// composition for the same user is already in flight.
    pub async fn acquire(&self, user_id: &str) -> OwnedSemaphorePermit {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(user_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        sem.acquire_owned()
            .await
            .expect("composition semaphore is never closed")
    }

    pub fn tracked_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop locks for users with no in-flight composition (cleanup).
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_access() {
        let map = CompositionLockMap::new();
        let permit1 = map.acquire("u1").await;
        drop(permit1);
        let permit2 = map.acquire("u1").await;
        drop(permit2);
    }

    #[tokio::test]
    async fn different_users_concurrent() {
        let map = Arc::new(CompositionLockMap::new());
        let p1 = map.acquire("u1").await;
        let p2 = map.acquire("u2").await;
        assert_eq!(map.tracked_count(), 2);
        drop(p1);
        drop(p2);
    }

    #[tokio::test]
    async fn same_user_waits() {
        let map = Arc::new(CompositionLockMap::new());
        let map2 = map.clone();

        let p1 = map.acquire("u1").await;
        let handle = tokio::spawn(async move {
            let _p2 = map2.acquire("u1").await;
            42
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(p1);

        let result = handle.await.unwrap();
        assert_eq!(result, 42);
    }
}
