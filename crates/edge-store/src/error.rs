//! Store and failover error types.

use std::time::Duration;

use edge_core::Region;
use thiserror::Error;

/// Errors from a single region's store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable, failing, or slower than the configured timeout.
    #[error("{region} store unavailable: {reason}")]
    Unavailable {
        /// Region whose store failed.
        region: Region,
        /// Backend-specific cause.
        reason: String,
    },
}

impl StoreError {
    /// Create an unavailable error.
    pub fn unavailable(region: Region, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            region,
            reason: reason.into(),
        }
    }

    /// Create an unavailable error for an elapsed deadline.
    pub fn timed_out(region: Region, timeout: Duration) -> Self {
        Self::unavailable(region, format!("timed out after {}ms", timeout.as_millis()))
    }

    /// Region the error originated from.
    pub fn region(&self) -> Region {
        match self {
            Self::Unavailable { region, .. } => *region,
        }
    }
}

/// Errors from the failover coordinator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailoverError {
    /// The active region failed and so did the retry against the other one.
    #[error("all regions exhausted (active: {active}; fallback: {fallback})")]
    RegionsExhausted {
        /// Failure from the region that was active.
        active: StoreError,
        /// Failure from the retry region.
        fallback: StoreError,
    },
}
