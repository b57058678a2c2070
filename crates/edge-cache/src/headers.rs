//! Cache response headers and debugging headers.

use serde::{Deserialize, Serialize};

use crate::policy::{CacheDirective, RouteClass};

/// Header names set on responses.
pub mod header_names {
    /// Standard Cache-Control header.
    pub const CACHE_CONTROL: &str = "Cache-Control";
    /// Request ID for tracing.
    pub const X_REQUEST_ID: &str = "X-Request-ID";
    /// Route class the path resolved to, or `default`.
    pub const X_CACHE_ROUTE_CLASS: &str = "X-Cache-Route-Class";
    /// Cache scope (public, private, none).
    pub const X_CACHE_SCOPE: &str = "X-Cache-Scope";
    /// Shared-cache TTL in seconds.
    pub const X_CACHE_TTL: &str = "X-Cache-TTL";
    /// Region that served a store operation.
    pub const X_SERVED_BY_REGION: &str = "X-Served-By-Region";
}

/// Explanation of the cache decision for one response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheExplainHeaders {
    /// Route class name.
    pub route_class: Option<String>,
    /// Cache scope.
    pub scope: Option<String>,
    /// Shared-cache TTL in seconds.
    pub ttl_secs: Option<u32>,
}

impl CacheExplainHeaders {
    /// Create empty explain headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the route class.
    pub fn with_route_class(mut self, class: Option<RouteClass>) -> Self {
        self.route_class = Some(class.map_or("default", |c| c.name()).to_string());
        self
    }

    /// Set scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set TTL.
    pub fn with_ttl(mut self, ttl_secs: u32) -> Self {
        self.ttl_secs = Some(ttl_secs);
        self
    }

    /// Build from a resolved directive and its route class.
    pub fn from_directive(directive: &CacheDirective, class: Option<RouteClass>) -> Self {
        let scope = directive
            .scope
            .map_or("none", |s| s.cache_control_directive());

        let explain = Self::new().with_route_class(class).with_scope(scope);
        match directive.shared_max_age_seconds {
            Some(ttl) => explain.with_ttl(ttl),
            None => explain,
        }
    }

    /// Convert to HTTP headers.
    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();

        if let Some(class) = &self.route_class {
            headers.push((header_names::X_CACHE_ROUTE_CLASS.to_string(), class.clone()));
        }

        if let Some(scope) = &self.scope {
            headers.push((header_names::X_CACHE_SCOPE.to_string(), scope.clone()));
        }

        if let Some(ttl) = self.ttl_secs {
            headers.push((header_names::X_CACHE_TTL.to_string(), ttl.to_string()));
        }

        headers
    }
}

/// Builder for cache response headers.
#[derive(Debug, Default)]
pub struct CacheHeadersBuilder {
    cache_control: Option<String>,
    request_id: Option<String>,
    explain: Option<CacheExplainHeaders>,
    include_debug: bool,
}

impl CacheHeadersBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set Cache-Control header.
    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    /// Set Cache-Control from a directive.
    pub fn cache_control_from_directive(mut self, directive: &CacheDirective) -> Self {
        self.cache_control = Some(directive.cache_control_header());
        self
    }

    /// Set the request ID header.
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Set debug explain headers.
    pub fn explain(mut self, headers: CacheExplainHeaders) -> Self {
        self.explain = Some(headers);
        self
    }

    /// Enable debug headers in output.
    pub fn include_debug(mut self, enabled: bool) -> Self {
        self.include_debug = enabled;
        self
    }

    /// Build the headers.
    pub fn build(self) -> Vec<(String, String)> {
        let mut headers = Vec::new();

        if let Some(cc) = self.cache_control {
            headers.push((header_names::CACHE_CONTROL.to_string(), cc));
        }

        if let Some(id) = self.request_id {
            headers.push((header_names::X_REQUEST_ID.to_string(), id));
        }

        if self.include_debug {
            if let Some(explain) = self.explain {
                headers.extend(explain.to_headers());
            }
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_without_debug_omits_explain() {
        let directive = RouteClass::Homepage.directive();
        let headers = CacheHeadersBuilder::new()
            .cache_control_from_directive(&directive)
            .request_id("abc")
            .explain(CacheExplainHeaders::from_directive(&directive, Some(RouteClass::Homepage)))
            .build();

        assert_eq!(
            headers,
            vec![
                ("Cache-Control".to_string(), "public, max-age=10, s-maxage=10".to_string()),
                ("X-Request-ID".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn test_builder_with_debug_adds_explain() {
        let directive = RouteClass::ExternalData.directive();
        let headers = CacheHeadersBuilder::new()
            .cache_control_from_directive(&directive)
            .explain(CacheExplainHeaders::from_directive(
                &directive,
                Some(RouteClass::ExternalData),
            ))
            .include_debug(true)
            .build();

        assert!(headers.contains(&("X-Cache-Route-Class".to_string(), "external-data".to_string())));
        assert!(headers.contains(&("X-Cache-Scope".to_string(), "public".to_string())));
        assert!(headers.contains(&("X-Cache-TTL".to_string(), "300".to_string())));
    }

    #[test]
    fn test_explain_for_unmatched_route() {
        let explain = CacheExplainHeaders::from_directive(&CacheDirective::safe_default(), None);
        assert_eq!(explain.route_class.as_deref(), Some("default"));
        assert_eq!(explain.scope.as_deref(), Some("private"));
        assert_eq!(explain.ttl_secs, None);
    }

    #[test]
    fn test_explain_for_mutation_has_no_scope() {
        let directive = RouteClass::Mutation.directive();
        let explain = CacheExplainHeaders::from_directive(&directive, Some(RouteClass::Mutation));
        assert_eq!(explain.scope.as_deref(), Some("none"));
    }
}
