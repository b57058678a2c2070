//! Observability for the multi-region SSR server.
//!
//! This crate provides:
//! - `StructuredLogger` - Structured logging with request context
//! - `MetricsCollector` / `RequestMetrics` - Per-request timing metrics
//! - `init_tracing` - Global subscriber setup

mod logging;
mod metrics;
mod subscriber;

pub use logging::*;
pub use metrics::*;
pub use subscriber::*;

// Re-exported for callers that only depend on this crate
pub use edge_core::RequestId;
