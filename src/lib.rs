//! Workspace umbrella crate for docgate.
//!
//! Re-exports the document store and, with the `server` feature, the HTTP
//! gateway so callers can embed either through a single dependency.
//!
//! ```
//! use docgate::{Document, DocumentStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(DocumentStore::open("memory://").unwrap());
//! let widgets = store.collection("widgets");
//!
//! let doc = Document::try_from(serde_json::json!({ "name": "bolt" })).unwrap();
//! let id = widgets.insert_one(doc).unwrap();
//! assert!(widgets.contains(&id).unwrap());
//! ```

pub use store::{
    BackendConfig, Collection, CompressionCodec, CompressionConfig, Document, DocumentId,
    DocumentStore, Filter, InMemoryBackend, StorageBackend, StoreConfig, StoreError, Value,
    ID_FIELD,
};

#[cfg(feature = "embedded")]
pub use store::RedbBackend;

#[cfg(feature = "server")]
pub use server::{
    build_router, start_server, GatewayError, Reply, ServerConfig, ServerResult, ServerState,
};

/// Full access to the store crate.
pub mod storage {
    pub use ::store::*;
}

/// Full access to the gateway crate.
#[cfg(feature = "server")]
pub mod gateway {
    pub use ::server::*;
}
