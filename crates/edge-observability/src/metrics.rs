//! Per-request timing metrics.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use edge_core::{Region, RequestId};
use serde::{Deserialize, Serialize};

/// Metrics for a single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMetrics {
    /// Request ID for correlation.
    pub request_id: String,
    /// HTTP method.
    pub method: String,
    /// Route path.
    pub route: String,
    /// Route class the cache policy resolved to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_class: Option<String>,
    /// Region that served the store operation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_by: Option<Region>,
    /// Dependency timings, keyed by `tag:operation`.
    pub dependencies: BTreeMap<String, DependencyMetrics>,
    /// Total request duration (microseconds).
    pub total_duration_us: u64,
    /// HTTP status code.
    pub status_code: u16,
}

/// Metrics for one dependency call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyMetrics {
    /// Dependency tag/name.
    pub tag: String,
    /// Operation performed.
    pub operation: String,
    /// Call duration (microseconds).
    pub duration_us: u64,
    /// Whether the call succeeded.
    pub success: bool,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Collector for request metrics.
#[derive(Debug)]
pub struct MetricsCollector {
    request_id: RequestId,
    method: String,
    route: String,
    route_class: Option<String>,
    served_by: Option<Region>,
    start: Instant,
    dependencies: BTreeMap<String, DependencyMetrics>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new(request_id: RequestId, method: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            request_id,
            method: method.into(),
            route: route.into(),
            route_class: None,
            served_by: None,
            start: Instant::now(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Set the route class.
    pub fn set_route_class(&mut self, class: impl Into<String>) {
        self.route_class = Some(class.into());
    }

    /// Set the region that served the request.
    pub fn set_served_by(&mut self, region: Region) {
        self.served_by = Some(region);
    }

    /// Record a dependency call.
    pub fn record_dependency(
        &mut self,
        tag: &str,
        operation: &str,
        duration: Duration,
        error: Option<String>,
    ) {
        let key = format!("{}:{}", tag, operation);
        self.dependencies.insert(
            key,
            DependencyMetrics {
                tag: tag.to_string(),
                operation: operation.to_string(),
                duration_us: duration.as_micros() as u64,
                success: error.is_none(),
                error,
            },
        );
    }

    /// Get total elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Finalize and return the metrics.
    pub fn finalize(self, status_code: u16) -> RequestMetrics {
        RequestMetrics {
            request_id: self.request_id.to_string(),
            method: self.method,
            route: self.route,
            route_class: self.route_class,
            served_by: self.served_by,
            dependencies: self.dependencies,
            total_duration_us: self.start.elapsed().as_micros() as u64,
            status_code,
        }
    }
}

impl RequestMetrics {
    /// Format as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Emit the metrics as one `tracing` event.
    pub fn log(&self) {
        tracing::info!(
            request_id = %self.request_id,
            method = %self.method,
            route = %self.route,
            route_class = self.route_class.as_deref().unwrap_or("default"),
            served_by = self.served_by.map_or("", |r| r.as_str()),
            status = self.status_code,
            total_us = self.total_duration_us,
            dependencies = %serde_json::to_string(&self.dependencies).unwrap_or_default(),
            "Request completed"
        );
    }

    /// Format as human-readable summary.
    pub fn to_summary(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Request: {} {} {} -> {}",
            self.request_id, self.method, self.route, self.status_code
        ));
        lines.push(format!(
            "  Total: {}us ({:.2}ms)",
            self.total_duration_us,
            self.total_duration_us as f64 / 1000.0
        ));

        if let Some(region) = self.served_by {
            lines.push(format!("  Served by: {}", region));
        }

        if !self.dependencies.is_empty() {
            lines.push("  Dependencies:".to_string());
            for dep in self.dependencies.values() {
                let status = if dep.success { "ok" } else { "FAILED" };
                lines.push(format!(
                    "    {} {} [{}]: {}us ({:.2}ms)",
                    dep.tag,
                    dep.operation,
                    status,
                    dep.duration_us,
                    dep.duration_us as f64 / 1000.0
                ));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_collects_dependencies() {
        let mut collector =
            MetricsCollector::new(RequestId::from_string("req-9"), "POST", "/api/counter");
        collector.set_route_class("mutation");
        collector.record_dependency("counter_store", "increment", Duration::from_micros(1500), None);
        collector.record_dependency(
            "counter_store",
            "read",
            Duration::from_micros(300),
            Some("primary store unavailable".to_string()),
        );
        collector.set_served_by(Region::Dr);

        let metrics = collector.finalize(200);
        assert_eq!(metrics.status_code, 200);
        assert_eq!(metrics.served_by, Some(Region::Dr));
        assert!(metrics.dependencies["counter_store:increment"].success);
        assert!(!metrics.dependencies["counter_store:read"].success);

        let json: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(json["served_by"], "dr");
        assert_eq!(json["route_class"], "mutation");
    }

    #[test]
    fn test_summary_mentions_failures() {
        let mut collector = MetricsCollector::new(RequestId::from_string("r"), "GET", "/api/dashboard");
        collector.record_dependency("counter_store", "read", Duration::from_micros(10), Some("x".into()));
        let summary = collector.finalize(503).to_summary();

        assert!(summary.contains("-> 503"));
        assert!(summary.contains("FAILED"));
    }
}
