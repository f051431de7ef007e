//! Concurrency guard
//!
//! In safe mode a store refuses every operation unless the caller holds the
//! index lock. `ConcurrencyGuard` hands out that lock: acquiring it returns an
//! [`IndexLock`] through which the index is used, and dropping (or
//! releasing) the lock lets the next waiter in.
//!
//! The guard is cheap to clone; all clones share the same index.

use crate::db::{Result, StoreError};
use crate::services::Capability;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async mutual exclusion around an index
pub struct ConcurrencyGuard<T: Capability> {
    inner: Arc<Mutex<T>>,
    timeout: Option<Duration>,
}

impl<T: Capability> Clone for ConcurrencyGuard<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            timeout: self.timeout,
        }
    }
}

impl<T: Capability> ConcurrencyGuard<T> {
    /// Wrap an index. The acquisition timeout comes from the index config.
    pub fn new(index: T) -> Self {
        let timeout = index.store().config().lock_timeout();
        Self {
            inner: Arc::new(Mutex::new(index)),
            timeout,
        }
    }

    /// Override the acquisition timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait for the lock.
    ///
    /// Fails with `StoreError::LockTimeout` if a timeout is configured and
    /// the lock is not granted in time.
    pub async fn acquire(&self) -> Result<IndexLock<T>> {
        let guard = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, Arc::clone(&self.inner).lock_owned())
                .await
                .map_err(|_| {
                    tracing::debug!("Index lock not granted within {:?}", timeout);
                    StoreError::lock_timeout(timeout.as_millis() as u64)
                })?,
            None => Arc::clone(&self.inner).lock_owned().await,
        };
        Ok(IndexLock::new(guard))
    }

    /// Take the lock only if it is free right now
    pub fn try_acquire(&self) -> Option<IndexLock<T>> {
        Arc::clone(&self.inner)
            .try_lock_owned()
            .ok()
            .map(IndexLock::new)
    }

    pub fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Unwrap the index if this is the last handle to it
    pub fn into_inner(self) -> Option<T> {
        Arc::try_unwrap(self.inner).ok().map(Mutex::into_inner)
    }
}

/// Exclusive access to a guarded index
///
/// Dereferences to the index itself. The store accepts operations while
/// this value is alive.
pub struct IndexLock<T: Capability> {
    guard: OwnedMutexGuard<T>,
}

impl<T: Capability> IndexLock<T> {
    fn new(mut guard: OwnedMutexGuard<T>) -> Self {
        guard.store_mut().set_lock_held(true);
        Self { guard }
    }

    /// Release the lock explicitly
    pub fn release(self) {
        drop(self);
    }
}

impl<T: Capability> Deref for IndexLock<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: Capability> DerefMut for IndexLock<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T: Capability> Drop for IndexLock<T> {
    fn drop(&mut self) {
        self.guard.store_mut().set_lock_held(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NodeStore;
    use crate::testing::{config, docs};
    use tokio_test::assert_ok;

    fn safe_store() -> NodeStore {
        NodeStore::new(docs(), config().thread_safe(Some(Duration::from_millis(20)))).unwrap()
    }

    #[tokio::test]
    async fn test_lock_enables_operations() {
        let guard = ConcurrencyGuard::new(safe_store());
        {
            let index = assert_ok!(guard.acquire().await);
            assert!(index.has("1").unwrap());
            assert!(guard.is_locked());
        }
        assert!(!guard.is_locked());

        let store = guard.into_inner().unwrap();
        assert!(matches!(store.has("1"), Err(StoreError::LockNotHeld)));
    }

    #[tokio::test]
    async fn test_acquire_times_out() {
        let guard = ConcurrencyGuard::new(safe_store());
        let held = assert_ok!(guard.acquire().await);

        let err = guard.acquire().await.err().unwrap();
        assert!(matches!(err, StoreError::LockTimeout { timeout_ms: 20 }));
        assert!(guard.try_acquire().is_none());

        held.release();
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_clones_share_index() {
        let guard = ConcurrencyGuard::new(safe_store());
        let other = guard.clone();
        {
            let mut index = other.acquire().await.unwrap();
            assert!(index.rm("5").unwrap());
        }
        let index = guard.acquire().await.unwrap();
        assert!(!index.has("5").unwrap());
    }
}
