//! HTTP routes.

use axum::extract::{Query, State};
use axum::http::{header, Uri};
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use edge_cache::RouteClass;
use edge_core::{Region, RequestId, TimingContext, API_BASE};
use edge_observability::StructuredLogger;
use edge_store::{FailoverEvent, FailoverState, HealthStatus, RegionHealth};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::middleware::{cache_policy, StoreOutcome};
use crate::pages;
use crate::state::AppState;

/// Build the application router.
///
/// Every response passes through [`cache_policy`], so routes without an
/// explicit `Cache-Control` get the directive their path resolves to.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/weather", get(weather))
        .route("/dashboard", get(dashboard))
        .route("/counter", post(increment_counter));

    Router::new()
        .route("/", get(homepage))
        .route("/about", get(about))
        .nest(API_BASE, api)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.cache_router.clone(),
            cache_policy,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn homepage(State(state): State<AppState>) -> Html<String> {
    let region = state.coordinator.active_region();
    Html(pages::render_homepage(Utc::now(), state.region_name(region)))
}

async fn about() -> Html<String> {
    Html(pages::render_about())
}

/// Health payload. Served with 200 whatever the region status.
#[derive(Debug, Serialize)]
pub struct HealthPayload {
    pub status: HealthStatus,
    pub active_region: Region,
    pub active_region_name: String,
    pub state: FailoverState,
    pub regions: Vec<RegionHealth>,
    /// Recent failovers and failbacks, oldest first.
    pub history: Vec<FailoverEvent>,
    pub checked_at: DateTime<Utc>,
}

async fn health(State(state): State<AppState>) -> Json<HealthPayload> {
    let regions = state.registry.all().await;
    let coordinator_state = state.coordinator.state();
    let active_region = coordinator_state.region();

    Json(HealthPayload {
        status: HealthStatus::from_regions(&regions),
        active_region,
        active_region_name: state.region_name(active_region).to_string(),
        state: coordinator_state,
        regions,
        history: state.coordinator.history(),
        checked_at: Utc::now(),
    })
}

#[derive(Debug, Deserialize)]
struct WeatherQuery {
    city: Option<String>,
}

async fn weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Response, ApiError> {
    let report = state.weather.get(query.city.as_deref()).await?;
    Ok(Json(report).into_response())
}

async fn dashboard(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Response {
    let logger = StructuredLogger::new(request_id).with_route("/api/dashboard");
    let mut timing = TimingContext::new();
    timing.mark_store_start("read");
    let result = state.dashboard.get_dashboard().await;
    timing.mark_store_done("read");

    let outcome = StoreOutcome {
        operation: "read",
        region: result.as_ref().ok().map(|d| d.region),
        duration: timing.store_timing("read").unwrap_or_default(),
        error: result.as_ref().err().map(|e| e.to_string()),
    };

    let response = match result {
        Ok(dashboard) => {
            logger
                .with_region(dashboard.region)
                .info_builder("Dashboard served")
                .field_u64("count", dashboard.count)
                .field_bool("healthy", dashboard.healthy)
                .duration_ms("store_ms", outcome.duration)
                .emit();
            with_directive(RouteClass::Dashboard, Json(dashboard))
        }
        Err(e) => {
            logger.error("Dashboard read failed in every region");
            ApiError::from(e).into_response()
        }
    };

    with_outcome(response, outcome)
}

/// Response to a counter increment.
#[derive(Debug, Serialize)]
pub struct CounterResponse {
    pub count: u64,
    pub region: Region,
    pub region_name: String,
    pub updated_at: DateTime<Utc>,
}

async fn increment_counter(State(state): State<AppState>) -> Response {
    let mut timing = TimingContext::new();
    timing.mark_store_start("increment");
    let result = state.counter.increment_counter().await;
    timing.mark_store_done("increment");

    let outcome = StoreOutcome {
        operation: "increment",
        region: result.as_ref().ok().map(|r| r.region),
        duration: timing.store_timing("increment").unwrap_or_default(),
        error: result.as_ref().err().map(|e| e.to_string()),
    };

    let response = match result {
        Ok(record) => with_directive(
            RouteClass::Mutation,
            Json(CounterResponse {
                count: record.value,
                region: record.region,
                region_name: state.region_name(record.region).to_string(),
                updated_at: record.last_updated_at,
            }),
        ),
        Err(e) => ApiError::from(e).into_response(),
    };

    with_outcome(response, outcome)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

/// Attach a route class's directive to a data response.
fn with_directive(class: RouteClass, body: impl IntoResponse) -> Response {
    (
        [(header::CACHE_CONTROL, class.directive().cache_control_header())],
        body,
    )
        .into_response()
}

fn with_outcome(mut response: Response, outcome: StoreOutcome) -> Response {
    response.extensions_mut().insert(outcome);
    response
}
