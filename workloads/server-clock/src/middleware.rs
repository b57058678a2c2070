//! Cache policy middleware.
//!
//! Resolves the route's cache directive, attaches `Cache-Control` when the
//! handler did not set one, stamps `X-Request-ID`, adds explain headers on
//! request, and logs per-request metrics.
//!
//! The route directive applies to successful responses only; any other
//! status is sent with the private no-store default.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::header::{HeaderName, HeaderValue, CACHE_CONTROL};
use axum::middleware::Next;
use axum::response::Response;
use edge_cache::{header_names, CacheExplainHeaders, CacheHeadersBuilder, CachePolicyRouter};
use edge_core::{Region, RequestContext};
use edge_data::DependencyTag;
use edge_observability::MetricsCollector;

/// Outcome of a store call, attached by handlers to their responses.
#[derive(Debug, Clone)]
pub struct StoreOutcome {
    /// Operation name.
    pub operation: &'static str,
    /// Region that served it, when it succeeded.
    pub region: Option<Region>,
    /// Time spent in the coordinator.
    pub duration: Duration,
    /// Failure message.
    pub error: Option<String>,
}

/// Apply the route cache policy to every response.
pub async fn cache_policy(
    State(router): State<CachePolicyRouter>,
    mut req: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::from_http(req.method(), req.uri(), req.headers());
    let mut metrics = MetricsCollector::new(
        ctx.request_id.clone(),
        ctx.method.as_str(),
        ctx.path.clone(),
    );
    req.extensions_mut().insert(ctx.request_id.clone());

    let mut response = next.run(req).await;

    let status = response.status().as_u16();
    let directive = router.resolve_for_status(&ctx.path, status);
    let class = router.resolve_class_for_status(&ctx.path, status);
    metrics.set_route_class(class.map_or("default", |c| c.name()));

    let handler_set = response.headers().contains_key(CACHE_CONTROL);
    let mut builder = CacheHeadersBuilder::new()
        .request_id(ctx.request_id.as_str())
        .explain(CacheExplainHeaders::from_directive(&directive, class))
        .include_debug(ctx.wants_cache_debug());
    if !handler_set {
        builder = builder.cache_control_from_directive(&directive);
    }

    let outcome = response.extensions().get::<StoreOutcome>().cloned();
    if let Some(outcome) = &outcome {
        metrics.record_dependency(
            DependencyTag::CounterStore.name(),
            outcome.operation,
            outcome.duration,
            outcome.error.clone(),
        );
        if let Some(region) = outcome.region {
            metrics.set_served_by(region);
        }
    }

    let mut pairs = builder.build();
    if let Some(region) = outcome.and_then(|o| o.region) {
        pairs.push((header_names::X_SERVED_BY_REGION.to_string(), region.to_string()));
    }

    let headers = response.headers_mut();
    for (name, value) in pairs {
        match (HeaderName::try_from(name.as_str()), HeaderValue::from_str(&value)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping invalid response header"),
        }
    }

    metrics.finalize(status).log();
    response
}
