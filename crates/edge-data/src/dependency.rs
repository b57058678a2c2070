//! Dependency tagging for semantic categorization.

use std::time::Duration;

/// Well-known dependency categories with semantic meaning.
///
/// Each tag carries a default timeout and retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyTag {
    /// Remote weather service behind the weather proxy.
    Weather,
    /// Regional counter store.
    CounterStore,
}

impl DependencyTag {
    /// Get the default timeout for this dependency type.
    pub fn default_timeout(&self) -> Duration {
        match self {
            Self::Weather => Duration::from_millis(3000),
            Self::CounterStore => Duration::from_millis(1000),
        }
    }

    /// Get the default max retries for this dependency type.
    ///
    /// Store calls are never retried here; the failover coordinator owns
    /// their single cross-region retry.
    pub fn default_max_retries(&self) -> u32 {
        match self {
            Self::Weather => 1,
            Self::CounterStore => 0,
        }
    }

    /// Get the name of this dependency.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::CounterStore => "counter_store",
        }
    }
}

impl std::fmt::Display for DependencyTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
