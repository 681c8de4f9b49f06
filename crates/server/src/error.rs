use crate::reply::Reply;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use store::StoreError;

pub type ServerResult<T> = Result<T, GatewayError>;

/// Message returned when a document identifier matches nothing.
pub const ITEM_NOT_FOUND: &str = "item not found";

/// Gateway error types
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The identifier does not name a document in the collection.
    #[error("item not found")]
    NotFound,

    /// No route matches the request path.
    #[error("Not found")]
    RouteNotFound,

    /// The store rejected a write, or the request body was unusable.
    /// The message is passed through verbatim.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl GatewayError {
    /// Wrap any error raised by a write operation: writes report store
    /// failures as bad requests, whatever their cause.
    pub fn bad_request<E: std::fmt::Display>(err: E) -> Self {
        GatewayError::BadRequest(err.to_string())
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NotFound | GatewayError::RouteNotFound => StatusCode::NOT_FOUND,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "request rejected");
        }
        Reply::error(status, self.to_string()).into_response()
    }
}

/// Store failures outside write operations. A malformed identifier is a
/// lookup miss; other caller mistakes are bad requests; the rest are
/// server errors.
impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidId(_) => GatewayError::NotFound,
            err if err.is_client_error() => GatewayError::BadRequest(err.to_string()),
            err => GatewayError::Internal(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for GatewayError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            let message = crate::middleware::panic_message(err.into_panic().as_ref());
            GatewayError::Internal(message)
        } else {
            GatewayError::Internal(format!("store task failed: {err}"))
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Internal(format!("IO error: {err}"))
    }
}
