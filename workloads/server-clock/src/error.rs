//! HTTP error responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use edge_cache::RouteClass;
use edge_data::FetchError;
use edge_store::FailoverError;
use serde::Serialize;

use crate::counter::ServiceError;

/// Errors returned by handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Both regions failed.
    #[error("Counter store unavailable in every region")]
    RegionsExhausted(#[source] FailoverError),

    /// The weather service failed.
    #[error("Upstream weather service failed: {0}")]
    Upstream(String),

    /// The request was malformed.
    #[error("{0}")]
    BadRequest(String),

    /// No route matched.
    #[error("No route for {0}")]
    NotFound(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable code.
    pub error: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RegionsExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RegionsExhausted(_) => "regions_exhausted",
            Self::Upstream(_) => "upstream_error",
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
        }
    }

    /// Whether the response must carry the no-store directive itself.
    ///
    /// Not-found responses are left to the route policy, which resolves
    /// unknown paths to the private no-store default.
    fn forces_no_store(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Failover(e) => Self::RegionsExhausted(e),
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidRequest(message) => Self::BadRequest(message),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::RegionsExhausted(e) => tracing::error!(error = %e, "Request failed"),
            Self::Upstream(_) => tracing::warn!(error = %self, "Request failed"),
            _ => tracing::debug!(error = %self, "Request rejected"),
        }

        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        let mut response = (status, Json(body)).into_response();

        if self.forces_no_store() {
            if let Ok(value) =
                HeaderValue::from_str(&RouteClass::Mutation.directive().cache_control_header())
            {
                response.headers_mut().insert(header::CACHE_CONTROL, value);
            }
        }

        response
    }
}
