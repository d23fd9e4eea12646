//! Per-owner serialization of relationship replaces

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Async mutexes keyed by owner resource path.
///
/// Holding the guard for an owner keeps every other replace or clear of
/// that owner's field waiting. Only requests within this process are
/// serialized.
#[derive(Debug, Default)]
pub struct OwnerLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock of `owner`
    pub async fn acquire(&self, owner: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // drop locks nobody holds or waits for
            locks.retain(|key, lock| key == owner || Arc::strong_count(lock) > 1);
            locks.entry(owner.to_string()).or_default().clone()
        };
        debug!("Waiting for relationship lock of {}", owner);
        lock.lock_owned().await
    }

    /// Number of owners currently tracked
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_owner_is_serialized() {
        let locks = Arc::new(OwnerLocks::new());
        let guard = locks.acquire("managed/user/1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("managed/user/1").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_other_owners_do_not_wait() {
        let locks = OwnerLocks::new();
        let _first = locks.acquire("managed/user/1").await;
        let _second = locks.acquire("managed/user/2").await;
        assert_eq!(locks.len().await, 2);
    }

    #[tokio::test]
    async fn test_released_locks_are_pruned() {
        let locks = OwnerLocks::new();
        drop(locks.acquire("managed/user/1").await);
        let _guard = locks.acquire("managed/user/2").await;
        assert_eq!(locks.len().await, 1);
        assert!(!locks.is_empty().await);
    }
}
