//! Generic collection endpoints.
//!
//! The first path segment names a collection and is resolved per request;
//! nothing is provisioned ahead of time. Store calls are blocking (redb
//! transactions) and run on the blocking pool.
//!
//! Write operations report any store failure as 400 with the store's own
//! message. Reads let store failures surface as 500. A malformed
//! identifier in the path is treated as a lookup miss (404).

use crate::error::{GatewayError, ServerResult};
use crate::extract::JsonBody;
use crate::reply::Reply;
use crate::state::ServerState;
use axum::extract::{Path, State};
use serde_json::json;
use std::sync::Arc;
use store::{Document, DocumentId, Filter, ID_FIELD};

pub const ITEM_CREATED: &str = "new item created";
pub const ITEM_UPDATED: &str = "item updated";

async fn blocking<F, T>(task: F) -> ServerResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(task).await?)
}

fn documents_json(docs: &[Document]) -> serde_json::Value {
    serde_json::Value::Array(docs.iter().map(Document::to_json).collect())
}

/// `PUT /{collection}` - insert the body as a new document.
pub async fn create_item(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    JsonBody(body): JsonBody<Document>,
) -> ServerResult<Reply> {
    let collection = state.collection(&name);
    let id = blocking(move || collection.insert_one(body))
        .await?
        .map_err(GatewayError::bad_request)?;

    tracing::info!(collection = %name, id = %id, "item created");
    Ok(Reply::created(
        json!({ "message": ITEM_CREATED, "_id": id.to_hex() }),
    ))
}

/// `GET /{collection}/count` - number of documents, 0 for unknown collections.
pub async fn count_items(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> ServerResult<Reply> {
    let collection = state.collection(&name);
    let count = blocking(move || collection.count()).await??;
    Ok(Reply::ok(json!({ "count": count })))
}

/// Identifier segment shadowed by the `/{collection}/count` route.
const COUNT_SEGMENT: &str = "count";

/// `PUT /{collection}/count` - `count` is an identifier here, and a malformed one.
pub async fn update_count_item(
    state: State<Arc<ServerState>>,
    Path(name): Path<String>,
    body: JsonBody<Document>,
) -> ServerResult<Reply> {
    update_item(state, Path((name, COUNT_SEGMENT.to_string())), body).await
}

/// `DELETE /{collection}/count`
pub async fn delete_count_item(
    state: State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> ServerResult<Reply> {
    delete_item(state, Path((name, COUNT_SEGMENT.to_string()))).await
}

/// `GET /{collection}` - every document of the collection.
pub async fn list_items(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> ServerResult<Reply> {
    let collection = state.collection(&name);
    let docs = blocking(move || collection.find_all()).await??;
    Ok(Reply::ok(documents_json(&docs)))
}

/// `POST /{collection}` - documents matching the filter in the body.
pub async fn filter_items(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    JsonBody(query): JsonBody<Document>,
) -> ServerResult<Reply> {
    let filter = Filter::new(query)?;
    let collection = state.collection(&name);
    let docs = blocking(move || collection.find(&filter)).await??;

    tracing::debug!(collection = %name, matched = docs.len(), "filter evaluated");
    Ok(Reply::ok(documents_json(&docs)))
}

/// `GET /{collection}/{id}` - one document by identifier.
pub async fn get_item(
    State(state): State<Arc<ServerState>>,
    Path((name, raw_id)): Path<(String, String)>,
) -> ServerResult<Reply> {
    let id = DocumentId::parse_str(&raw_id)?;
    let collection = state.collection(&name);
    let doc = blocking(move || collection.find_one(&id))
        .await??
        .ok_or(GatewayError::NotFound)?;
    Ok(Reply::ok(doc.to_json()))
}

/// `PUT /{collection}/{id}` - merge the body into the stored document.
///
/// Fields present in the patch overwrite stored ones, absent fields are
/// kept. The identifier never changes: an `_id` in the patch is dropped
/// when the merged document is persisted under the original identifier.
pub async fn update_item(
    State(state): State<Arc<ServerState>>,
    Path((name, raw_id)): Path<(String, String)>,
    JsonBody(patch): JsonBody<Document>,
) -> ServerResult<Reply> {
    let id = DocumentId::parse_str(&raw_id)?;
    if patch.contains_key(ID_FIELD) {
        tracing::debug!(collection = %name, id = %id, "ignoring _id in update patch");
    }

    let collection = state.collection(&name);
    blocking(move || -> ServerResult<()> {
        let mut current = collection.find_one(&id)?.ok_or(GatewayError::NotFound)?;
        current.merge(patch);

        // Not atomic with the read above; a concurrent delete makes this a no-op.
        let replaced = collection
            .replace_one(&id, current)
            .map_err(GatewayError::bad_request)?;
        if !replaced {
            tracing::debug!(collection = %collection.name(), id = %id, "item vanished before replace");
        }
        Ok(())
    })
    .await??;

    tracing::info!(collection = %name, id = %id, "item updated");
    Ok(Reply::ok(json!({ "message": ITEM_UPDATED })))
}

/// `DELETE /{collection}/{id}` - remove one document.
pub async fn delete_item(
    State(state): State<Arc<ServerState>>,
    Path((name, raw_id)): Path<(String, String)>,
) -> ServerResult<Reply> {
    let id = DocumentId::parse_str(&raw_id)?;
    let collection = state.collection(&name);
    blocking(move || -> ServerResult<()> {
        if !collection.contains(&id)? {
            return Err(GatewayError::NotFound);
        }
        let deleted = collection
            .delete_one(&id)
            .map_err(GatewayError::bad_request)?;
        if !deleted {
            tracing::debug!(collection = %collection.name(), id = %id, "item already deleted");
        }
        Ok(())
    })
    .await??;

    tracing::info!(collection = %name, id = %id, "item deleted");
    Ok(Reply::no_content())
}
