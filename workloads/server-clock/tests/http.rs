//! End-to-end tests driving the router with in-memory regional stores.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use edge_core::{AppConfig, Region};
use edge_data::{FetchError, WeatherSource};
use edge_store::InMemoryStore;
use server_clock::{build_router, AppState};
use tower::ServiceExt;

#[derive(Default)]
struct FakeWeather {
    calls: AtomicUsize,
    failing: AtomicBool,
}

#[async_trait]
impl WeatherSource for FakeWeather {
    async fn fetch(&self, city: &str) -> Result<serde_json::Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Connection("upstream down".into()));
        }
        Ok(serde_json::json!({ "city": city, "temp_c": 12 }))
    }
}

struct Harness {
    app: Router,
    state: AppState,
    primary: Arc<InMemoryStore>,
    dr: Arc<InMemoryStore>,
    weather: Arc<FakeWeather>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    fn with_config(config: AppConfig) -> Self {
        let primary = Arc::new(InMemoryStore::new(Region::Primary, "ssr-poc-visits"));
        let dr = Arc::new(primary.replica(Region::Dr));
        let weather = Arc::new(FakeWeather::default());

        let state = AppState::new(
            config,
            primary.clone(),
            dr.clone(),
            weather.clone(),
        );

        Self {
            app: build_router(state.clone()),
            state,
            primary,
            dr,
            weather,
        }
    }

    async fn send(&self, method: Method, uri: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Method::GET, uri).await
    }

    async fn post(&self, uri: &str) -> Response {
        self.send(Method::POST, uri).await
    }
}

fn cache_control(response: &Response) -> &str {
    response.headers()[header::CACHE_CONTROL].to_str().unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_every_route_carries_its_cache_control() {
    let h = Harness::new();

    let cases = [
        (Method::GET, "/about", "public, max-age=3600, s-maxage=3600"),
        (Method::GET, "/", "public, max-age=10, s-maxage=10"),
        (Method::GET, "/api/health", "public, max-age=30, s-maxage=30"),
        (Method::GET, "/api/weather", "public, max-age=300, s-maxage=300"),
        (Method::GET, "/api/dashboard", "no-cache, private, must-revalidate"),
        (Method::POST, "/api/counter", "no-cache, no-store, must-revalidate"),
    ];

    for (method, path, expected) in cases {
        let response = h.send(method, path).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        assert_eq!(cache_control(&response), expected, "{path}");
    }
}

#[tokio::test]
async fn test_query_string_does_not_change_policy() {
    let h = Harness::new();

    let response = h.get("/about?ref=nav").await;
    assert_eq!(cache_control(&response), "public, max-age=3600, s-maxage=3600");

    let response = h.get("/api/weather?city=Paris").await;
    assert_eq!(cache_control(&response), "public, max-age=300, s-maxage=300");
}

#[tokio::test]
async fn test_counter_increments_on_primary() {
    let h = Harness::new();

    let first = json_body(h.post("/api/counter").await).await;
    let response = h.post("/api/counter").await;
    assert_eq!(
        response.headers()["x-served-by-region"].to_str().unwrap(),
        "primary"
    );
    let second = json_body(response).await;

    assert_eq!(first["count"], 1);
    assert_eq!(second["count"], 2);
    assert_eq!(second["region"], "primary");
    assert_eq!(second["region_name"], "us-east-1");
    assert_eq!(h.dr.operation_count(), 0);
}

#[tokio::test]
async fn test_dashboard_served_from_dr_when_primary_down() {
    let h = Harness::new();

    h.post("/api/counter").await;
    h.post("/api/counter").await;
    h.primary.set_available(false);

    let response = h.get("/api/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_control(&response), "no-cache, private, must-revalidate");
    assert_eq!(response.headers()["x-served-by-region"].to_str().unwrap(), "dr");

    let body = json_body(response).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["region"], "dr");
    assert_eq!(body["region_name"], "us-west-2");
    assert_eq!(body["state"], "using_dr");
    assert_eq!(body["healthy"], false);

    // Subsequent writes go straight to DR.
    let primary_ops = h.primary.operation_count();
    let body = json_body(h.post("/api/counter").await).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["region"], "dr");
    assert_eq!(h.primary.operation_count(), primary_ops);
}

#[tokio::test]
async fn test_both_regions_down_is_503_no_store() {
    let h = Harness::new();
    h.primary.set_available(false);
    h.dr.set_available(false);

    let response = h.post("/api/counter").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(cache_control(&response), "no-cache, no-store, must-revalidate");
    assert!(response.headers().get("x-served-by-region").is_none());
    let body = json_body(response).await;
    assert_eq!(body["error"], "regions_exhausted");

    let response = h.get("/api/dashboard").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(cache_control(&response), "no-cache, no-store, must-revalidate");
}

#[tokio::test]
async fn test_unknown_path_gets_safe_default() {
    let h = Harness::new();

    let response = h.get("/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        cache_control(&response),
        "no-cache, private, no-store, must-revalidate"
    );

    let response = h.get("/api/unknown").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        cache_control(&response),
        "no-cache, private, no-store, must-revalidate"
    );
}

#[tokio::test]
async fn test_non_success_on_table_path_gets_safe_default() {
    let h = Harness::new();
    let safe_default = "no-cache, private, no-store, must-revalidate";

    let response = h.get("/about/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(cache_control(&response), safe_default);

    let response = h.get("/api/health/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(cache_control(&response), safe_default);

    let response = h.post("/about").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(cache_control(&response), safe_default);

    let response = h.get("/api/counter").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(cache_control(&response), safe_default);
}

#[tokio::test]
async fn test_slow_primary_fails_over_on_store_timeout() {
    let h = Harness::with_config(AppConfig {
        store_timeout_ms: 50,
        ..Default::default()
    });
    h.post("/api/counter").await;
    h.primary.set_latency(Duration::from_millis(500));

    let response = h.post("/api/counter").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-served-by-region"].to_str().unwrap(), "dr");
    let body = json_body(response).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["region"], "dr");

    let primary_ops = h.primary.operation_count();
    let body = json_body(h.get("/api/dashboard").await).await;
    assert_eq!(body["region"], "dr");
    assert_eq!(h.primary.operation_count(), primary_ops);
}

#[tokio::test]
async fn test_health_lists_failover_history() {
    let h = Harness::new();

    let body = json_body(h.get("/api/health").await).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 0);

    h.primary.set_available(false);
    h.post("/api/counter").await;

    let body = json_body(h.get("/api/health").await).await;
    assert_eq!(body["state"], "using_dr");
    assert_eq!(body["active_region"], "dr");
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["from"], "primary");
    assert_eq!(history[0]["to"], "dr");
    assert_eq!(history[0]["kind"], "failover");
}

#[tokio::test]
async fn test_request_id_generated_and_echoed() {
    let h = Harness::new();

    let response = h.get("/about").await;
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert!(!generated.is_empty());

    let request = Request::builder()
        .uri("/about")
        .header("x-request-id", "req-abc-123")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-abc-123");
}

#[tokio::test]
async fn test_debug_header_explains_policy() {
    let h = Harness::new();

    let plain = h.get("/about").await;
    assert!(plain.headers().get("x-cache-route-class").is_none());

    let request = Request::builder()
        .uri("/about")
        .header("x-debug-cache", "1")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-cache-route-class"], "static-page");
    assert_eq!(response.headers()["x-cache-scope"], "public");
    assert_eq!(response.headers()["x-cache-ttl"], "3600");

    let request = Request::builder()
        .uri("/nowhere")
        .header("x-debug-cache", "1")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-cache-route-class"], "default");
}

#[tokio::test]
async fn test_health_reports_degraded_with_200() {
    let h = Harness::new();

    let body = json_body(h.get("/api/health").await).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["active_region"], "primary");

    h.primary.set_available(false);
    h.state.probe.check_now().await;

    let response = h.get("/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["regions"].as_array().unwrap().len(), 2);
    assert_eq!(body["regions"][0]["region"], "primary");
    assert_eq!(body["regions"][0]["reachable"], false);
    assert_eq!(body["regions"][0]["consecutive_failures"], 1);
}

#[tokio::test]
async fn test_failback_after_primary_recovers() {
    let h = Harness::new();

    h.primary.set_available(false);
    h.post("/api/counter").await;
    assert_eq!(h.state.coordinator.active_region(), Region::Dr);

    h.primary.set_available(true);
    for _ in 0..3 {
        h.state.probe.check_now().await;
    }

    let body = json_body(h.post("/api/counter").await).await;
    assert_eq!(body["region"], "primary");
    assert_eq!(body["count"], 2);
    assert_eq!(h.state.coordinator.active_region(), Region::Primary);
}

#[tokio::test]
async fn test_weather_is_cached_per_city() {
    let h = Harness::new();

    let first = json_body(h.get("/api/weather?city=Paris").await).await;
    let second = json_body(h.get("/api/weather?city=paris").await).await;

    assert_eq!(first["city"], "paris");
    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], true);
    assert_eq!(h.weather.calls.load(Ordering::SeqCst), 1);

    let default_city = json_body(h.get("/api/weather").await).await;
    assert_eq!(default_city["city"], "seattle");
}

#[tokio::test]
async fn test_weather_upstream_failure_is_502_no_store() {
    let h = Harness::new();
    h.weather.failing.store(true, Ordering::SeqCst);

    let response = h.get("/api/weather?city=Oslo").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(cache_control(&response), "no-cache, no-store, must-revalidate");
}

#[tokio::test]
async fn test_pages_render_html() {
    let h = Harness::new();

    let response = h.get("/").await;
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("<title>SSR Server Clock</title>"));
    assert!(html.contains("Rendered in us-east-1"));
}
