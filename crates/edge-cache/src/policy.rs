//! Cache directives and route classes.

use serde::{Deserialize, Serialize};

/// Cache scope determining who can cache the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheScope {
    /// Cacheable by CDN and browser (shared cache).
    Public,
    /// Cacheable by browser only (private cache).
    Private,
}

impl CacheScope {
    /// Get the Cache-Control directive for this scope.
    pub fn cache_control_directive(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

/// How caches must treat a stored response once it is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Revalidation {
    /// Plain freshness lifetime.
    #[default]
    None,
    /// Caches must revalidate with the origin before reuse.
    MustRevalidate,
    /// Nothing may be stored.
    NoStore,
}

/// Resolved cache policy for one response.
///
/// Directives are plain values: resolving the same route twice yields equal
/// directives and equal header strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheDirective {
    /// Cache scope, absent for directives that forbid storage outright.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<CacheScope>,
    /// Browser-facing freshness lifetime.
    pub max_age_seconds: u32,
    /// Shared-cache (CDN) freshness lifetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_max_age_seconds: Option<u32>,
    /// Revalidation mode.
    pub revalidation: Revalidation,
}

impl CacheDirective {
    /// Public directive cacheable by the CDN for `shared_max_age` seconds and
    /// by browsers for `max_age` seconds.
    pub const fn public(max_age: u32, shared_max_age: u32) -> Self {
        Self {
            scope: Some(CacheScope::Public),
            max_age_seconds: max_age,
            shared_max_age_seconds: Some(shared_max_age),
            revalidation: Revalidation::None,
        }
    }

    /// Private directive that forces revalidation on every use.
    pub const fn private_must_revalidate() -> Self {
        Self {
            scope: Some(CacheScope::Private),
            max_age_seconds: 0,
            shared_max_age_seconds: None,
            revalidation: Revalidation::MustRevalidate,
        }
    }

    /// Directive for mutations: never stored anywhere.
    pub const fn no_store() -> Self {
        Self {
            scope: None,
            max_age_seconds: 0,
            shared_max_age_seconds: None,
            revalidation: Revalidation::NoStore,
        }
    }

    /// Directive for paths with no registered policy.
    pub const fn safe_default() -> Self {
        Self {
            scope: Some(CacheScope::Private),
            max_age_seconds: 0,
            shared_max_age_seconds: None,
            revalidation: Revalidation::NoStore,
        }
    }

    /// Whether any cache may store this response.
    pub fn is_cacheable(&self) -> bool {
        self.revalidation != Revalidation::NoStore
    }

    /// Whether a shared cache (CDN) may serve this response without revalidating.
    pub fn is_cdn_cacheable(&self) -> bool {
        self.scope == Some(CacheScope::Public)
            && self.revalidation == Revalidation::None
            && self.shared_max_age_seconds.unwrap_or(self.max_age_seconds) > 0
    }

    /// Generate the Cache-Control header value.
    pub fn cache_control_header(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        match self.revalidation {
            Revalidation::None => {
                if let Some(scope) = self.scope {
                    parts.push(scope.cache_control_directive().to_string());
                }
                parts.push(format!("max-age={}", self.max_age_seconds));
                if let Some(shared) = self.shared_max_age_seconds {
                    parts.push(format!("s-maxage={}", shared));
                }
            }
            Revalidation::MustRevalidate => {
                parts.push("no-cache".to_string());
                if let Some(scope) = self.scope {
                    parts.push(scope.cache_control_directive().to_string());
                }
                parts.push("must-revalidate".to_string());
            }
            Revalidation::NoStore => {
                parts.push("no-cache".to_string());
                if let Some(scope) = self.scope {
                    parts.push(scope.cache_control_directive().to_string());
                }
                parts.push("no-store".to_string());
                parts.push("must-revalidate".to_string());
            }
        }

        parts.join(", ")
    }
}

impl Default for CacheDirective {
    fn default() -> Self {
        Self::safe_default()
    }
}

/// Endpoint classes with distinct freshness tradeoffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteClass {
    /// Content that rarely changes.
    StaticPage,
    /// Time-sensitive landing page; a short TTL still absorbs most traffic.
    Homepage,
    /// Polled by monitors; safe to cache briefly.
    HealthCheck,
    /// Slow-moving upstream data; caching protects the upstream rate limit.
    ExternalData,
    /// Live counter reads.
    Dashboard,
    /// State-changing endpoints.
    Mutation,
}

impl RouteClass {
    /// Every route class.
    pub const ALL: [RouteClass; 6] = [
        RouteClass::StaticPage,
        RouteClass::Homepage,
        RouteClass::HealthCheck,
        RouteClass::ExternalData,
        RouteClass::Dashboard,
        RouteClass::Mutation,
    ];

    /// The directive this class is served with.
    pub const fn directive(&self) -> CacheDirective {
        match self {
            Self::StaticPage => CacheDirective::public(3600, 3600),
            Self::Homepage => CacheDirective::public(10, 10),
            Self::HealthCheck => CacheDirective::public(30, 30),
            Self::ExternalData => CacheDirective::public(300, 300),
            Self::Dashboard => CacheDirective::private_must_revalidate(),
            Self::Mutation => CacheDirective::no_store(),
        }
    }

    /// Get the name of this class.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StaticPage => "static-page",
            Self::Homepage => "homepage",
            Self::HealthCheck => "health-check",
            Self::ExternalData => "external-data",
            Self::Dashboard => "dashboard",
            Self::Mutation => "mutation",
        }
    }
}

impl std::fmt::Display for RouteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
