//! SSR Server Clock.
//!
//! A server-rendered clock page plus a visit counter replicated across a
//! primary and a DR region. The HTTP layer attaches a route-level
//! `Cache-Control` policy to every response; counter operations go through
//! a failover coordinator that moves to the DR region when the primary is
//! unreachable and back once it has been healthy for long enough.
//!
//! The binary in `main.rs` loads configuration, starts the health probe and
//! serves [`routes::build_router`].

pub mod counter;
pub mod dashboard;
pub mod error;
pub mod middleware;
pub mod pages;
pub mod routes;
pub mod state;

pub use counter::{CounterService, ServiceError};
pub use dashboard::{Dashboard, DashboardAggregator};
pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
