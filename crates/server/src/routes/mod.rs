//! API route handlers
//!
//! - root: greeting, server time and the fallback for unknown routes
//! - `documents`: the generic collection endpoints (create, count, list,
//!   filter, fetch, merge update, delete)

pub mod documents;

use crate::error::{GatewayError, ServerResult};
use crate::extract::JsonBody;
use crate::reply::Reply;
use crate::state::ServerState;
use axum::extract::{Path, State};
use serde_json::json;
use std::sync::Arc;
use store::Document;

/// Greeting returned by `GET /`.
pub const GREETING: &str = "Hello World!";

/// `GET /` - say hello.
pub async fn home() -> Reply {
    Reply::ok(json!(GREETING))
}

/// `GET /time` - current server time, handy for clients syncing clocks.
pub async fn server_time() -> Reply {
    Reply::ok(json!({ "time": chrono::Utc::now().to_rfc3339() }))
}

/// Name of the collection shadowed by the `/time` route.
const TIME_COLLECTION: &str = "time";

/// `PUT /time` - `/time` only claims GET; writes go to the `time` collection.
pub async fn create_time_item(
    state: State<Arc<ServerState>>,
    body: JsonBody<Document>,
) -> ServerResult<Reply> {
    documents::create_item(state, Path(TIME_COLLECTION.to_string()), body).await
}

/// `POST /time` - filter the `time` collection.
pub async fn filter_time_items(
    state: State<Arc<ServerState>>,
    body: JsonBody<Document>,
) -> ServerResult<Reply> {
    documents::filter_items(state, Path(TIME_COLLECTION.to_string()), body).await
}

/// 404 Not Found handler for undefined routes.
pub async fn not_found() -> GatewayError {
    GatewayError::RouteNotFound
}
