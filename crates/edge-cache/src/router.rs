//! Path to cache directive resolution.

use std::sync::Arc;

use edge_core::API_BASE;
use serde::Serialize;

use crate::policy::{CacheDirective, RouteClass};

/// Route pattern in the policy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum RoutePattern {
    /// Matches one path exactly.
    Exact(String),
    /// Matches a path and everything below it, on segment boundaries.
    Prefix(String),
}

impl RoutePattern {
    /// Create an exact pattern.
    pub fn exact(path: impl Into<String>) -> Self {
        Self::Exact(path.into())
    }

    /// Create a prefix pattern.
    pub fn prefix(path: impl Into<String>) -> Self {
        Self::Prefix(path.into())
    }

    /// The literal path of this pattern.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(p) | Self::Prefix(p) => p,
        }
    }

    /// Whether this is an exact pattern.
    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact(_))
    }

    /// Check if a normalized path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(p) => path == p,
            Self::Prefix(p) => {
                if p.ends_with('/') {
                    path.starts_with(p.as_str())
                } else {
                    path == p
                        || path
                            .strip_prefix(p.as_str())
                            .is_some_and(|rest| rest.starts_with('/'))
                }
            }
        }
    }

    /// Sort key for precedence: longer patterns first, exact before prefix.
    fn precedence(&self) -> (usize, bool) {
        (self.as_str().len(), self.is_exact())
    }
}

/// One row of the policy table.
#[derive(Debug, Clone, Serialize)]
pub struct RouteRule {
    /// Path pattern.
    pub pattern: RoutePattern,
    /// Endpoint class the pattern belongs to.
    pub class: RouteClass,
    /// Directive attached to matching responses.
    pub directive: CacheDirective,
}

impl RouteRule {
    /// Create a rule using the class's directive.
    pub fn new(pattern: RoutePattern, class: RouteClass) -> Self {
        Self {
            pattern,
            class,
            directive: class.directive(),
        }
    }
}

/// Ordered list of route rules. Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoutePolicyTable {
    rules: Vec<RouteRule>,
}

impl RoutePolicyTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table for the SSR server's routes.
    pub fn standard() -> Self {
        Self::new()
            .with_rule(RoutePattern::exact("/about"), RouteClass::StaticPage)
            .with_rule(RoutePattern::exact("/"), RouteClass::Homepage)
            .with_rule(RoutePattern::exact(format!("{API_BASE}/health")), RouteClass::HealthCheck)
            .with_rule(RoutePattern::exact(format!("{API_BASE}/weather")), RouteClass::ExternalData)
            .with_rule(RoutePattern::exact(format!("{API_BASE}/dashboard")), RouteClass::Dashboard)
            .with_rule(RoutePattern::exact(format!("{API_BASE}/counter")), RouteClass::Mutation)
    }

    /// Add a rule for a route class.
    pub fn with_rule(mut self, pattern: RoutePattern, class: RouteClass) -> Self {
        self.rules.push(RouteRule::new(pattern, class));
        self
    }

    /// All rules in registration order.
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Find the winning rule for a path.
    ///
    /// The longest matching pattern wins; an exact pattern beats a prefix
    /// pattern of the same length; remaining ties go to the earlier rule.
    pub fn lookup(&self, path: &str) -> Option<&RouteRule> {
        let path = normalize_path(path);
        let mut best: Option<&RouteRule> = None;

        for rule in self.rules.iter().filter(|r| r.pattern.matches(path)) {
            match best {
                Some(current) if current.pattern.precedence() >= rule.pattern.precedence() => {}
                _ => best = Some(rule),
            }
        }

        best
    }
}

/// Resolves the cache directive for a request path.
///
/// Cheap to clone; all clones share one table.
#[derive(Debug, Clone)]
pub struct CachePolicyRouter {
    table: Arc<RoutePolicyTable>,
}

impl CachePolicyRouter {
    /// Create a router over a table.
    pub fn new(table: RoutePolicyTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Resolve the directive for a path. Unmatched paths get
    /// [`CacheDirective::safe_default`].
    pub fn resolve(&self, path: &str) -> CacheDirective {
        self.table
            .lookup(path)
            .map(|rule| rule.directive)
            .unwrap_or_else(CacheDirective::safe_default)
    }

    /// Resolve the directive for a response with `status` on `path`.
    ///
    /// Only successful responses carry the route's directive. Redirects,
    /// client errors and server errors get the safe default so a CDN never
    /// stores them under the route's TTL.
    pub fn resolve_for_status(&self, path: &str, status: u16) -> CacheDirective {
        if is_success(status) {
            self.resolve(path)
        } else {
            CacheDirective::safe_default()
        }
    }

    /// Route class for a response, or `None` when the safe default applies.
    pub fn resolve_class_for_status(&self, path: &str, status: u16) -> Option<RouteClass> {
        if is_success(status) {
            self.resolve_class(path)
        } else {
            None
        }
    }

    /// Resolve the route class for a path, if any rule matches.
    pub fn resolve_class(&self, path: &str) -> Option<RouteClass> {
        self.table.lookup(path).map(|rule| rule.class)
    }

    /// The underlying table.
    pub fn table(&self) -> &RoutePolicyTable {
        &self.table
    }
}

impl Default for CachePolicyRouter {
    fn default() -> Self {
        Self::new(RoutePolicyTable::standard())
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Strip the query string and fragment. Trailing slashes are significant:
/// `/about/` is a different route from `/about`.
fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    match &path[..end] {
        "" => "/",
        path => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{CacheScope, Revalidation};

    #[test]
    fn test_standard_table_headers() {
        let router = CachePolicyRouter::default();
        let cases = [
            ("/about", "public, max-age=3600, s-maxage=3600"),
            ("/", "public, max-age=10, s-maxage=10"),
            ("/api/health", "public, max-age=30, s-maxage=30"),
            ("/api/weather", "public, max-age=300, s-maxage=300"),
            ("/api/dashboard", "no-cache, private, must-revalidate"),
            ("/api/counter", "no-cache, no-store, must-revalidate"),
        ];

        for (path, header) in cases {
            assert_eq!(router.resolve(path).cache_control_header(), header, "{path}");
        }
    }

    #[test]
    fn test_standard_table_classes() {
        let router = CachePolicyRouter::default();
        assert_eq!(router.resolve_class("/about"), Some(RouteClass::StaticPage));
        assert_eq!(router.resolve_class("/"), Some(RouteClass::Homepage));
        assert_eq!(router.resolve_class("/api/counter"), Some(RouteClass::Mutation));
        assert_eq!(router.resolve_class("/api/unknown"), None);
    }

    #[test]
    fn test_unregistered_path_gets_safe_default() {
        let router = CachePolicyRouter::default();
        for path in ["/admin", "/api", "/api/counter/extra", "/aboutus", "/about/"] {
            let directive = router.resolve(path);
            assert_eq!(directive.scope, Some(CacheScope::Private), "{path}");
            assert_eq!(directive.max_age_seconds, 0, "{path}");
            assert_eq!(directive.revalidation, Revalidation::NoStore, "{path}");
        }
    }

    #[test]
    fn test_query_string_does_not_change_directive() {
        let router = CachePolicyRouter::default();
        assert_eq!(
            router.resolve("/api/weather?city=Tokyo"),
            router.resolve("/api/weather")
        );
    }

    #[test]
    fn test_trailing_slash_is_a_different_route() {
        let router = CachePolicyRouter::default();
        assert_eq!(router.resolve("/about/"), CacheDirective::safe_default());
        assert_eq!(router.resolve_class("/api/health/"), None);
        assert_eq!(router.resolve(""), router.resolve("/"));
    }

    #[test]
    fn test_non_success_status_gets_safe_default() {
        let router = CachePolicyRouter::default();
        assert_eq!(
            router.resolve_for_status("/about", 200).cache_control_header(),
            "public, max-age=3600, s-maxage=3600"
        );
        assert_eq!(router.resolve_class_for_status("/about", 204), Some(RouteClass::StaticPage));

        for status in [301, 404, 405, 500, 503] {
            assert_eq!(
                router.resolve_for_status("/about", status),
                CacheDirective::safe_default(),
                "{status}"
            );
            assert_eq!(router.resolve_class_for_status("/about", status), None);
        }
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let router = CachePolicyRouter::default();
        let first = router.resolve("/about");
        for _ in 0..100 {
            let again = router.resolve("/about");
            assert_eq!(again, first);
            assert_eq!(again.cache_control_header(), first.cache_control_header());
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = RoutePolicyTable::new()
            .with_rule(RoutePattern::prefix("/docs"), RouteClass::StaticPage)
            .with_rule(RoutePattern::prefix("/docs/live"), RouteClass::Dashboard);
        let router = CachePolicyRouter::new(table);

        assert_eq!(router.resolve_class("/docs/intro"), Some(RouteClass::StaticPage));
        assert_eq!(router.resolve_class("/docs/live/feed"), Some(RouteClass::Dashboard));
        assert_eq!(router.resolve_class("/docs"), Some(RouteClass::StaticPage));
        assert_eq!(router.resolve_class("/docsearch"), None);
    }

    #[test]
    fn test_exact_beats_prefix_of_equal_length() {
        let table = RoutePolicyTable::new()
            .with_rule(RoutePattern::prefix("/status"), RouteClass::HealthCheck)
            .with_rule(RoutePattern::exact("/status"), RouteClass::Dashboard);
        let router = CachePolicyRouter::new(table);

        assert_eq!(router.resolve_class("/status"), Some(RouteClass::Dashboard));
        assert_eq!(router.resolve_class("/status/db"), Some(RouteClass::HealthCheck));
    }

    #[test]
    fn test_earlier_rule_wins_exact_tie() {
        let table = RoutePolicyTable::new()
            .with_rule(RoutePattern::exact("/x"), RouteClass::Homepage)
            .with_rule(RoutePattern::exact("/x"), RouteClass::Mutation);
        assert_eq!(table.lookup("/x").map(|r| r.class), Some(RouteClass::Homepage));
    }

    #[test]
    fn test_trailing_slash_prefix() {
        let pattern = RoutePattern::prefix("/assets/");
        assert!(pattern.matches("/assets/app.css"));
        assert!(!pattern.matches("/assets"));
    }

    #[test]
    fn test_clones_share_table() {
        let router = CachePolicyRouter::default();
        let clone = router.clone();
        assert!(Arc::ptr_eq(&router.table, &clone.table));
        assert_eq!(clone.table().len(), 6);
    }
}
