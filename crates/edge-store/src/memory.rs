//! In-process regional store.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use edge_core::Region;

use crate::error::StoreError;
use crate::record::CounterRecord;
use crate::regional::RegionalStore;

type Counters = Arc<DashMap<String, AtomicU64>>;

/// Process-local store with one atomic counter per key.
///
/// Keys are namespaced as `"{table}:{key}"`. The availability switch and the
/// artificial latency stand in for regional outages and slow backends.
pub struct InMemoryStore {
    region: Region,
    table: String,
    counters: Counters,
    available: AtomicBool,
    latency_ms: AtomicU64,
    operations: AtomicU64,
}

impl InMemoryStore {
    /// Create an empty, available store.
    pub fn new(region: Region, table: impl Into<String>) -> Self {
        Self::with_counters(region, table.into(), Arc::new(DashMap::new()))
    }

    /// Create a store for `region` that shares this store's data.
    ///
    /// Writes in either store are visible in the other immediately, which
    /// models a replicated table with no lag. Availability is independent.
    pub fn replica(&self, region: Region) -> Self {
        Self::with_counters(region, self.table.clone(), Arc::clone(&self.counters))
    }

    fn with_counters(region: Region, table: String, counters: Counters) -> Self {
        Self {
            region,
            table,
            counters,
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
            operations: AtomicU64::new(0),
        }
    }

    /// Make the store reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Whether the store is currently reachable.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Delay every operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of operations attempted against this store.
    pub fn operation_count(&self) -> u64 {
        self.operations.load(Ordering::SeqCst)
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.table, key)
    }

    async fn begin(&self) -> Result<(), StoreError> {
        self.operations.fetch_add(1, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::unavailable(self.region, "region offline"))
        }
    }
}

#[async_trait]
impl RegionalStore for InMemoryStore {
    fn region(&self) -> Region {
        self.region
    }

    async fn increment(&self, key: &str) -> Result<CounterRecord, StoreError> {
        self.begin().await?;

        let value = self
            .counters
            .entry(self.namespaced(key))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst)
            + 1;

        Ok(CounterRecord::new(key, value, self.region))
    }

    async fn read(&self, key: &str) -> Result<CounterRecord, StoreError> {
        self.begin().await?;

        let value = self
            .counters
            .get(&self.namespaced(key))
            .map(|counter| counter.load(Ordering::SeqCst))
            .unwrap_or(0);

        Ok(CounterRecord::new(key, value, self.region))
    }
}
