//! Endpoint-level error responses.
//!
//! Errors of the endpoints themselves (bad input, contention) are plain-text
//! 4xx/5xx bodies. Upstream failures never come through here: the proxy
//! encodes them in its JSON reply and discovery turns them into events.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::discovery::DiscoveryError;
use crate::presets::PresetError;
use crate::proxy::ProxyError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// The generic 400 used for undecodable bodies.
    pub fn bad_request() -> Self {
        ApiError::BadRequest("bad request".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }
        (status, self.to_string()).into_response()
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<DiscoveryError> for ApiError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::EmptyTarget => ApiError::BadRequest(err.to_string()),
            DiscoveryError::AlreadyRunning => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<PresetError> for ApiError {
    fn from(err: PresetError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Fallback for API routes hit with an unsupported method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
