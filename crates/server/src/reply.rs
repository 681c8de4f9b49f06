//! The response funnel.
//!
//! Every handler result, success or failure, leaves the server as a
//! [`Reply`]: a status code plus an optional JSON payload, always labelled
//! `application/json`. Bodiless replies (204) carry an empty payload.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

/// Fallback message when even an error message cannot be produced.
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    status: StatusCode,
    body: Option<Value>,
}

impl Reply {
    pub fn new(status: StatusCode, body: impl Into<Value>) -> Self {
        Self {
            status,
            body: Some(body.into()),
        }
    }

    /// 200 with `body`.
    pub fn ok(body: impl Into<Value>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// 201 with `body`.
    pub fn created(body: impl Into<Value>) -> Self {
        Self::new(StatusCode::CREATED, body)
    }

    /// 204 with an empty payload.
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }

    /// `{"error": message}` with the given status.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = UNKNOWN_ERROR.to_string();
        }
        Self::new(status, json!({ "error": message }))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let json = HeaderValue::from_static("application/json");
        let payload = match &self.body {
            Some(body) => serde_json::to_vec(body),
            None => Ok(Vec::new()),
        };

        match payload {
            Ok(bytes) => (self.status, [(CONTENT_TYPE, json)], bytes).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize response body");
                let fallback = format!(r#"{{"error":"{UNKNOWN_ERROR}"}}"#);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(CONTENT_TYPE, json)],
                    fallback,
                )
                    .into_response()
            }
        }
    }
}
