//! Read-only dashboard composition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use edge_core::Region;
use edge_store::{FailoverState, HealthRegistry, HealthStatus, RegionHealth};
use serde::Serialize;

use crate::counter::{CounterService, ServiceError};

/// Dashboard payload.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// Current visit count.
    pub count: u64,
    /// Region that served the read.
    pub region: Region,
    /// Configured identifier of that region.
    pub region_name: String,
    /// Whether every region is reachable.
    pub healthy: bool,
    /// When the dashboard was assembled.
    pub as_of: DateTime<Utc>,
    /// Coordinator state after the read.
    pub state: FailoverState,
    /// Per-region health snapshots.
    pub regions: Vec<RegionHealth>,
}

/// Combines the counter value with region health.
#[derive(Clone)]
pub struct DashboardAggregator {
    counter: CounterService,
    registry: Arc<HealthRegistry>,
    primary_name: String,
    dr_name: String,
}

impl DashboardAggregator {
    /// Create an aggregator.
    pub fn new(
        counter: CounterService,
        registry: Arc<HealthRegistry>,
        primary_name: impl Into<String>,
        dr_name: impl Into<String>,
    ) -> Self {
        Self {
            counter,
            registry,
            primary_name: primary_name.into(),
            dr_name: dr_name.into(),
        }
    }

    /// Read the counter and snapshot region health.
    pub async fn get_dashboard(&self) -> Result<Dashboard, ServiceError> {
        let record = self.counter.current().await?;
        let regions = self.registry.all().await;

        Ok(Dashboard {
            count: record.value,
            region: record.region,
            region_name: self.region_name(record.region).to_string(),
            healthy: HealthStatus::from_regions(&regions) == HealthStatus::Healthy,
            as_of: Utc::now(),
            state: self.counter.coordinator().state(),
            regions,
        })
    }

    fn region_name(&self, region: Region) -> &str {
        match region {
            Region::Primary => &self.primary_name,
            Region::Dr => &self.dr_name,
        }
    }
}
