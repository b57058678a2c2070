//! Per-request context.

use http::{HeaderMap, Method, Uri};

/// Request header that opts a response into cache explain headers.
pub const DEBUG_CACHE_HEADER: &str = "X-Debug-Cache";

/// Request header carrying the request id across the CDN hop.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the cache layer needs to know about an inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Inbound `X-Request-ID`, or a fresh one.
    pub request_id: RequestId,
    pub method: Method,
    /// Request path, without the query string.
    pub path: String,
    /// Whether the caller sent `X-Debug-Cache: 1`.
    pub cache_debug: bool,
}

impl RequestContext {
    /// Build a context from the parts of an `http` request.
    pub fn from_http(method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|id| !id.is_empty())
            .map(RequestId::from_string)
            .unwrap_or_else(RequestId::generate);

        let cache_debug = headers
            .get(DEBUG_CACHE_HEADER)
            .and_then(|v| v.to_str().ok())
            == Some("1");

        Self {
            request_id,
            method: method.clone(),
            path: uri.path().to_string(),
            cache_debug,
        }
    }

    /// Whether the caller asked for cache explain headers.
    pub fn wants_cache_debug(&self) -> bool {
        self.cache_debug
    }
}
