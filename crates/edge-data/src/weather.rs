//! Read-through cache in front of the remote weather service.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::client::{FetchClient, FetchError};
use crate::dependency::DependencyTag;

/// Longest city name accepted from a query string.
const MAX_CITY_LEN: usize = 64;

/// Source of raw weather documents.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch the current conditions for `city`.
    async fn fetch(&self, city: &str) -> Result<serde_json::Value, FetchError>;
}

/// The remote weather service, reached over HTTP.
///
/// Requests `{base_url}/{city}?format=j1`.
pub struct RemoteWeather {
    client: FetchClient,
    base_url: String,
}

impl RemoteWeather {
    /// Create a source for the service at `base_url`.
    pub fn new(client: FetchClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, city: &str) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| FetchError::InvalidRequest(format!("weather url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidRequest("weather url cannot take a path".into()))?
            .pop_if_empty()
            .push(city);
        url.query_pairs_mut().append_pair("format", "j1");
        Ok(url)
    }
}

#[async_trait]
impl WeatherSource for RemoteWeather {
    async fn fetch(&self, city: &str) -> Result<serde_json::Value, FetchError> {
        let url = self.url_for(city)?;
        self.client.fetch(url.as_str(), DependencyTag::Weather).await
    }
}

/// Weather data returned by the proxy.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherReport {
    /// Normalized city name.
    pub city: String,
    /// Upstream document, passed through unchanged.
    pub data: serde_json::Value,
    /// When the upstream document was fetched.
    pub fetched_at: DateTime<Utc>,
    /// Whether the report came from the proxy cache.
    pub cached: bool,
}

struct CacheEntry {
    report: WeatherReport,
    stored_at: Instant,
}

/// Read-through TTL cache keyed by city.
///
/// Entries are never served past the TTL; an expired entry is refetched and
/// a failed refetch is returned as an error.
pub struct WeatherProxy {
    source: Arc<dyn WeatherSource>,
    default_city: String,
    ttl: Duration,
    entries: DashMap<String, CacheEntry>,
}

impl WeatherProxy {
    /// Create a proxy over `source`.
    pub fn new(source: Arc<dyn WeatherSource>, default_city: impl Into<String>, ttl: Duration) -> Self {
        Self {
            source,
            default_city: default_city.into(),
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Weather for `city`, or the default city when absent or blank.
    pub async fn get(&self, city: Option<&str>) -> Result<WeatherReport, FetchError> {
        let city = self.normalize_city(city)?;

        if let Some(entry) = self.entries.get(&city) {
            if entry.stored_at.elapsed() < self.ttl {
                tracing::debug!(city = %city, "Weather cache hit");
                let mut report = entry.report.clone();
                report.cached = true;
                return Ok(report);
            }
        }

        tracing::debug!(city = %city, "Weather cache miss");
        let data = self.source.fetch(&city).await?;
        let report = WeatherReport {
            city: city.clone(),
            data,
            fetched_at: Utc::now(),
            cached: false,
        };

        self.entries.insert(
            city,
            CacheEntry {
                report: report.clone(),
                stored_at: Instant::now(),
            },
        );

        Ok(report)
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before - self.entries.len()
    }

    /// Number of cached cities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn normalize_city(&self, city: Option<&str>) -> Result<String, FetchError> {
        let city = city
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.default_city.as_str());

        if city.len() > MAX_CITY_LEN {
            return Err(FetchError::InvalidRequest(format!(
                "city name longer than {MAX_CITY_LEN} bytes"
            )));
        }
        if city.chars().any(|c| c.is_control() || c == '/') {
            return Err(FetchError::InvalidRequest("city name contains invalid characters".into()));
        }

        Ok(city.to_lowercase())
    }
}
