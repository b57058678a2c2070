//! Region health tracking and probing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use edge_core::Region;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::error::StoreError;
use crate::regional::SharedStore;

/// Observed health of one region's store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionHealth {
    /// Region.
    pub region: Region,
    /// Whether the last observation succeeded.
    pub reachable: bool,
    /// When the region was last checked, if ever.
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Failed observations in a row.
    pub consecutive_failures: u32,
    /// Successful observations in a row.
    pub consecutive_successes: u32,
    /// Latency of the last probe.
    pub last_latency_ms: Option<u64>,
}

impl RegionHealth {
    /// Initial state: assumed reachable, never checked.
    pub fn new(region: Region) -> Self {
        Self {
            region,
            reachable: true,
            last_checked_at: None,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_latency_ms: None,
        }
    }

    fn record_success(&mut self, latency: Duration) {
        self.reachable = true;
        self.consecutive_failures = 0;
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.last_checked_at = Some(Utc::now());
        self.last_latency_ms = Some(latency.as_millis() as u64);
    }

    fn record_failure(&mut self, latency: Option<Duration>) {
        self.reachable = false;
        self.consecutive_successes = 0;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_checked_at = Some(Utc::now());
        if let Some(latency) = latency {
            self.last_latency_ms = Some(latency.as_millis() as u64);
        }
    }
}

/// Aggregate status across regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every region reachable.
    Healthy,
    /// Some but not all regions reachable.
    Degraded,
    /// No region reachable.
    Unhealthy,
}

impl HealthStatus {
    /// Status for a set of region snapshots.
    pub fn from_regions(regions: &[RegionHealth]) -> Self {
        let reachable = regions.iter().filter(|r| r.reachable).count();
        if reachable == regions.len() && reachable > 0 {
            Self::Healthy
        } else if reachable > 0 {
            Self::Degraded
        } else {
            Self::Unhealthy
        }
    }
}

/// Shared map of region health.
///
/// Written by the probe and by the coordinator after failed operations;
/// read by the coordinator and the HTTP handlers.
#[derive(Debug)]
pub struct HealthRegistry {
    regions: RwLock<HashMap<Region, RegionHealth>>,
}

impl HealthRegistry {
    /// Create a registry with an entry for each region.
    pub fn new(regions: impl IntoIterator<Item = Region>) -> Self {
        let regions = regions
            .into_iter()
            .map(|region| (region, RegionHealth::new(region)))
            .collect();
        Self {
            regions: RwLock::new(regions),
        }
    }

    /// Snapshot of one region.
    pub async fn get(&self, region: Region) -> RegionHealth {
        self.regions
            .read()
            .await
            .get(&region)
            .cloned()
            .unwrap_or_else(|| RegionHealth::new(region))
    }

    /// Snapshot of every region, primary first.
    pub async fn all(&self) -> Vec<RegionHealth> {
        let mut regions: Vec<_> = self.regions.read().await.values().cloned().collect();
        regions.sort_by_key(|r| r.region);
        regions
    }

    /// Aggregate status.
    pub async fn status(&self) -> HealthStatus {
        HealthStatus::from_regions(&self.all().await)
    }

    /// Record a successful probe.
    pub async fn record_success(&self, region: Region, latency: Duration) {
        self.regions
            .write()
            .await
            .entry(region)
            .or_insert_with(|| RegionHealth::new(region))
            .record_success(latency);
    }

    /// Record a failed probe.
    pub async fn record_failure(&self, region: Region, latency: Duration) {
        self.regions
            .write()
            .await
            .entry(region)
            .or_insert_with(|| RegionHealth::new(region))
            .record_failure(Some(latency));
    }

    /// Mark a region unreachable after a failed store operation.
    pub async fn mark_unreachable(&self, region: Region) {
        self.regions
            .write()
            .await
            .entry(region)
            .or_insert_with(|| RegionHealth::new(region))
            .record_failure(None);
    }
}

/// Periodic and on-demand reachability checks of each region's store.
pub struct HealthProbe {
    stores: Vec<SharedStore>,
    registry: Arc<HealthRegistry>,
    health_key: String,
    interval: Duration,
    timeout: Duration,
}

impl HealthProbe {
    /// Create a probe over `stores`.
    pub fn new(
        stores: Vec<SharedStore>,
        registry: Arc<HealthRegistry>,
        health_key: impl Into<String>,
    ) -> Self {
        Self {
            stores,
            registry,
            health_key: health_key.into(),
            interval: Duration::from_secs(15),
            timeout: Duration::from_secs(2),
        }
    }

    /// Set the period between checks.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the per-check timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Period between scheduled checks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The registry this probe writes to.
    pub fn registry(&self) -> &Arc<HealthRegistry> {
        &self.registry
    }

    /// Check one region now. Never fails; the outcome lands in the registry.
    pub async fn check_region(&self, region: Region) -> RegionHealth {
        if let Some(store) = self.stores.iter().find(|s| s.region() == region) {
            self.check_store(store).await;
        }
        self.registry.get(region).await
    }

    /// Check every region now, concurrently.
    pub async fn check_now(&self) -> Vec<RegionHealth> {
        join_all(self.stores.iter().map(|store| self.check_store(store))).await;
        self.registry.all().await
    }

    async fn check_store(&self, store: &SharedStore) {
        let region = store.region();
        let started = Instant::now();

        let outcome = match tokio::time::timeout(self.timeout, store.read(&self.health_key)).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(StoreError::timed_out(region, self.timeout)),
        };
        let latency = started.elapsed();

        match outcome {
            Ok(()) => {
                tracing::debug!(
                    region = %region,
                    latency_ms = latency.as_millis() as u64,
                    "Health check passed"
                );
                self.registry.record_success(region, latency).await;
            }
            Err(e) => {
                tracing::warn!(
                    region = %region,
                    latency_ms = latency.as_millis() as u64,
                    error = %e,
                    "Health check failed"
                );
                self.registry.record_failure(region, latency).await;
            }
        }
    }

    /// Run checks every interval until `shutdown_rx` flips to `true`.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            timeout_ms = self.timeout.as_millis() as u64,
            regions = self.stores.len(),
            "Health probe started"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Health probe shutting down");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.check_now().await;
                }
            }
        }
    }

    /// Spawn the periodic loop on the runtime.
    pub fn spawn(self: Arc<Self>) -> ProbeHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        ProbeHandle { shutdown_tx, task }
    }
}

/// Handle to a spawned probe loop.
pub struct ProbeHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ProbeHandle {
    /// Signal the loop to stop and wait for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Health probe task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    fn setup() -> (Arc<InMemoryStore>, Arc<InMemoryStore>, HealthProbe) {
        let primary = Arc::new(InMemoryStore::new(Region::Primary, "t"));
        let dr = Arc::new(InMemoryStore::new(Region::Dr, "t"));
        let registry = Arc::new(HealthRegistry::new(Region::ALL));
        let stores: Vec<SharedStore> = vec![primary.clone(), dr.clone()];
        let probe = HealthProbe::new(stores, registry, "health")
            .with_timeout(Duration::from_millis(50));
        (primary, dr, probe)
    }

    #[tokio::test]
    async fn test_success_and_failure_counters() {
        let (primary, _dr, probe) = setup();

        probe.check_region(Region::Primary).await;
        let health = probe.check_region(Region::Primary).await;
        assert!(health.reachable);
        assert_eq!(health.consecutive_successes, 2);
        assert_eq!(health.consecutive_failures, 0);
        assert!(health.last_checked_at.is_some());

        primary.set_available(false);
        let health = probe.check_region(Region::Primary).await;
        assert!(!health.reachable);
        assert_eq!(health.consecutive_successes, 0);
        assert_eq!(health.consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_slow_store_counts_as_failure() {
        let (_primary, dr, probe) = setup();
        dr.set_latency(Duration::from_millis(300));

        let health = probe.check_region(Region::Dr).await;
        assert!(!health.reachable);
        assert!(health.last_latency_ms.is_some());
    }

    #[tokio::test]
    async fn test_overall_status() {
        let (primary, dr, probe) = setup();

        probe.check_now().await;
        assert_eq!(probe.registry().status().await, HealthStatus::Healthy);

        primary.set_available(false);
        probe.check_now().await;
        assert_eq!(probe.registry().status().await, HealthStatus::Degraded);

        dr.set_available(false);
        probe.check_now().await;
        assert_eq!(probe.registry().status().await, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_mark_unreachable_resets_successes() {
        let registry = HealthRegistry::new(Region::ALL);
        registry.record_success(Region::Primary, Duration::from_millis(1)).await;
        registry.mark_unreachable(Region::Primary).await;

        let health = registry.get(Region::Primary).await;
        assert!(!health.reachable);
        assert_eq!(health.consecutive_successes, 0);
        assert_eq!(health.consecutive_failures, 1);
        assert!(health.last_checked_at.is_some());
        assert_eq!(health.last_latency_ms, Some(1));
    }

    #[tokio::test]
    async fn test_spawned_loop_runs_and_stops() {
        let (_primary, _dr, probe) = setup();
        let probe = Arc::new(probe.with_interval(Duration::from_millis(10)));
        let registry = Arc::clone(probe.registry());

        let handle = Arc::clone(&probe).spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;

        assert!(registry.get(Region::Primary).await.consecutive_successes >= 1);
    }
}
