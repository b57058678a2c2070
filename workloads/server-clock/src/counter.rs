//! Visit counter application API.

use std::sync::Arc;

use edge_core::COUNTER_KEY;
use edge_store::{CounterRecord, FailoverCoordinator, FailoverError};

/// Errors surfaced by the application services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Neither region could serve the operation.
    #[error(transparent)]
    Failover(#[from] FailoverError),
}

/// Increments and reads the visit counter through the failover coordinator.
#[derive(Clone)]
pub struct CounterService {
    coordinator: Arc<FailoverCoordinator>,
    key: String,
}

impl CounterService {
    /// Create a service for the standard counter key.
    pub fn new(coordinator: Arc<FailoverCoordinator>) -> Self {
        Self::with_key(coordinator, COUNTER_KEY)
    }

    /// Create a service for a custom key.
    pub fn with_key(coordinator: Arc<FailoverCoordinator>, key: impl Into<String>) -> Self {
        Self {
            coordinator,
            key: key.into(),
        }
    }

    /// Record a visit. Returns the new count and the region that took the write.
    pub async fn increment_counter(&self) -> Result<CounterRecord, ServiceError> {
        let record = self.coordinator.increment(&self.key).await?;
        tracing::info!(
            key = %record.key,
            value = record.value,
            region = %record.region,
            "Counter incremented"
        );
        Ok(record)
    }

    /// Current count from the active region.
    pub async fn current(&self) -> Result<CounterRecord, ServiceError> {
        Ok(self.coordinator.read(&self.key).await?)
    }

    /// The coordinator behind this service.
    pub fn coordinator(&self) -> &Arc<FailoverCoordinator> {
        &self.coordinator
    }
}
