//! Counter records.

use chrono::{DateTime, Utc};
use edge_core::Region;
use serde::{Deserialize, Serialize};

/// A counter value as observed in one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    /// Counter key.
    pub key: String,
    /// Current value. Never decreases within one region's write history.
    pub value: u64,
    /// When the record was produced.
    pub last_updated_at: DateTime<Utc>,
    /// Region that served the record.
    pub region: Region,
}

impl CounterRecord {
    /// Create a record stamped with the current time.
    pub fn new(key: impl Into<String>, value: u64, region: Region) -> Self {
        Self {
            key: key.into(),
            value,
            last_updated_at: Utc::now(),
            region,
        }
    }

    /// Record for a key that has never been written.
    pub fn zero(key: impl Into<String>, region: Region) -> Self {
        Self::new(key, 0, region)
    }
}
