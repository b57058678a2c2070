//! The per-region store abstraction.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use edge_core::Region;

use crate::error::StoreError;
use crate::record::CounterRecord;

/// Counter storage in one region.
///
/// `increment` must be an atomic add on the backend, never a read followed
/// by a write. A key that has never been written reads as zero.
#[async_trait]
pub trait RegionalStore: Send + Sync {
    /// Region this store lives in.
    fn region(&self) -> Region;

    /// Atomically add one to `key` and return the new value.
    async fn increment(&self, key: &str) -> Result<CounterRecord, StoreError>;

    /// Read the current value of `key`.
    async fn read(&self, key: &str) -> Result<CounterRecord, StoreError>;
}

/// Shared handle to a store.
pub type SharedStore = Arc<dyn RegionalStore>;

/// Applies a deadline to every call on the wrapped store.
///
/// Elapsed deadlines surface as [`StoreError::Unavailable`].
pub struct TimedStore {
    inner: SharedStore,
    timeout: Duration,
}

impl TimedStore {
    /// Wrap a store with a timeout.
    pub fn new(inner: SharedStore, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl RegionalStore for TimedStore {
    fn region(&self) -> Region {
        self.inner.region()
    }

    async fn increment(&self, key: &str) -> Result<CounterRecord, StoreError> {
        tokio::time::timeout(self.timeout, self.inner.increment(key))
            .await
            .map_err(|_| StoreError::timed_out(self.region(), self.timeout))?
    }

    async fn read(&self, key: &str) -> Result<CounterRecord, StoreError> {
        tokio::time::timeout(self.timeout, self.inner.read(key))
            .await
            .map_err(|_| StoreError::timed_out(self.region(), self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    #[tokio::test]
    async fn test_timed_store_passes_through() {
        let inner = Arc::new(InMemoryStore::new(Region::Primary, "t"));
        let store = TimedStore::new(inner, Duration::from_millis(500));

        assert_eq!(store.increment("visits").await.unwrap().value, 1);
        assert_eq!(store.read("visits").await.unwrap().value, 1);
        assert_eq!(store.region(), Region::Primary);
    }

    #[tokio::test]
    async fn test_timed_store_maps_deadline_to_unavailable() {
        let inner = Arc::new(InMemoryStore::new(Region::Dr, "t"));
        inner.set_latency(Duration::from_millis(200));
        let store = TimedStore::new(inner, Duration::from_millis(20));

        let err = store.read("visits").await.unwrap_err();
        assert_eq!(err, StoreError::timed_out(Region::Dr, Duration::from_millis(20)));
    }
}
