//! Outbound data access with dependency tagging and timeouts.
//!
//! This crate provides:
//! - `FetchClient` - HTTP fetch with automatic timeout/retry
//! - `DependencyTag` - Semantic dependency categories
//! - `TimeoutConfig` - Per-dependency timeouts
//! - `RetryPolicy` - Retry strategies
//! - `WeatherProxy` - Read-through cache in front of the weather service

mod client;
mod dependency;
mod retry;
mod timeout;
mod weather;

pub use client::*;
pub use dependency::*;
pub use retry::*;
pub use timeout::*;
pub use weather::*;
