//! Core abstractions for the multi-region SSR server.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `AppConfig` - Process-wide configuration, loaded once at startup
//! - `Region` - The two deployment regions (primary and DR)
//! - `RequestContext` - Request id, path and debug flag for the cache layer
//! - `TimingContext` - Store call timing marks

mod config;
mod context;
mod lifecycle;
mod region;

pub use config::*;
pub use context::*;
pub use lifecycle::*;
pub use region::*;
