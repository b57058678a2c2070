//! Route-level cache-control policies for the multi-region SSR server.
//!
//! This crate provides:
//! - `CacheDirective` - Resolved freshness/revalidation policy for a response
//! - `RouteClass` - The endpoint classes the server distinguishes
//! - `RoutePolicyTable` - Ordered (pattern, directive) mapping built at startup
//! - `CachePolicyRouter` - Path to directive resolution
//! - `CacheHeadersBuilder` / `CacheExplainHeaders` - Response headers
//!
//! # Example
//!
//! ```
//! use edge_cache::{CachePolicyRouter, RoutePolicyTable};
//!
//! let router = CachePolicyRouter::new(RoutePolicyTable::standard());
//!
//! let about = router.resolve("/about");
//! assert_eq!(about.cache_control_header(), "public, max-age=3600, s-maxage=3600");
//!
//! // Unknown routes are never cached.
//! let unknown = router.resolve("/not-a-route");
//! assert!(!unknown.is_cacheable());
//! ```

mod headers;
mod policy;
mod router;

pub use headers::*;
pub use policy::*;
pub use router::*;
