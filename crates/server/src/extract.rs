use crate::error::GatewayError;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use serde::de::DeserializeOwned;

/// JSON request body extractor.
///
/// Unlike `axum::Json` it does not insist on a `Content-Type` header, and
/// every rejection becomes a `{"error": ...}` envelope instead of plain text.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            let status = rejection.status();
            let message = rejection.body_text();
            if status == StatusCode::PAYLOAD_TOO_LARGE {
                GatewayError::PayloadTooLarge(message)
            } else {
                GatewayError::BadRequest(message)
            }
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(GatewayError::BadRequest(
                "request body must be a JSON object".to_string(),
            ));
        }

        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|err| GatewayError::BadRequest(format!("invalid JSON body: {err}")))
    }
}
