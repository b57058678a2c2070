//! Outbound HTTP client with dependency tagging.

use std::time::Instant;

use serde::de::DeserializeOwned;

use crate::dependency::DependencyTag;
use crate::retry::RetryPolicy;
use crate::timeout::TimeoutConfig;

/// Error type for fetch operations.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request error: {0}")]
    Request(String),
}

impl FetchError {
    fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout(url.to_string())
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::Deserialization(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                url: url.to_string(),
            }
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Fetch policy combining timeout and retry configuration.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Timeout configuration.
    pub timeout: TimeoutConfig,
    /// Retry policy.
    pub retry: RetryPolicy,
}

impl FetchPolicy {
    /// Create from a dependency tag's defaults.
    pub fn from_tag(tag: DependencyTag) -> Self {
        Self {
            timeout: TimeoutConfig::from_total(tag.default_timeout()),
            retry: RetryPolicy::new(tag.default_max_retries()),
        }
    }
}

/// Outbound fetch client.
///
/// Applies per-dependency timeouts and retries and logs each attempt.
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: reqwest::Client,
}

impl FetchClient {
    /// Create a client with a connect timeout suitable for `tag`.
    pub fn new(tag: DependencyTag) -> Result<Self, FetchError> {
        let timeout = TimeoutConfig::from_total(tag.default_timeout());
        let http = reqwest::Client::builder()
            .connect_timeout(timeout.connect)
            .user_agent(concat!("server-clock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { http })
    }

    /// Fetch JSON with timeout and retry based on the dependency tag.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        tag: DependencyTag,
    ) -> Result<T, FetchError> {
        self.fetch_with_policy(url, tag, &FetchPolicy::from_tag(tag)).await
    }

    /// Fetch JSON with an explicit policy.
    pub async fn fetch_with_policy<T: DeserializeOwned>(
        &self,
        url: &str,
        tag: DependencyTag,
        policy: &FetchPolicy,
    ) -> Result<T, FetchError> {
        let mut attempt = 0;
        loop {
            let started = Instant::now();
            let result = self.fetch_once(url, policy).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(value) => {
                    tracing::debug!(dependency = %tag, url, attempt, duration_ms, "Fetch succeeded");
                    return Ok(value);
                }
                Err(e) if policy.retry.should_retry(&e, attempt) => {
                    let delay = policy.retry.backoff.delay_for_attempt(attempt);
                    tracing::warn!(
                        dependency = %tag,
                        url,
                        attempt,
                        duration_ms,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "Fetch failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(dependency = %tag, url, attempt, duration_ms, error = %e, "Fetch failed");
                    return Err(e);
                }
            }
        }
    }

    async fn fetch_once<T: DeserializeOwned>(
        &self,
        url: &str,
        policy: &FetchPolicy,
    ) -> Result<T, FetchError> {
        let resp = self
            .http
            .get(url)
            .timeout(policy.timeout.total)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, url))?;

        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| FetchError::from_reqwest(e, url))
    }
}
