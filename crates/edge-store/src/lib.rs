//! Multi-region persistence for the visit counter.
//!
//! This crate provides:
//! - `RegionalStore` - Counter storage in one region (atomic increment, point read)
//! - `InMemoryStore` / `RedisStore` / `TimedStore` - Store implementations
//! - `HealthRegistry` / `HealthProbe` - Per-region reachability tracking
//! - `FailoverCoordinator` - Active-region selection with failover and failback

mod error;
mod failover;
mod health;
mod memory;
mod record;
#[cfg(feature = "redis")]
mod redis_store;
mod regional;

pub use error::*;
pub use failover::*;
pub use health::*;
pub use memory::*;
pub use record::*;
#[cfg(feature = "redis")]
pub use redis_store::*;
pub use regional::*;
