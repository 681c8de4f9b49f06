use crate::config::ServerConfig;
use crate::error::ServerResult;
use std::sync::Arc;
use store::{Collection, DocumentStore};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Document store (shared across requests; the only shared resource)
    pub store: Arc<DocumentStore>,
}

impl ServerState {
    /// Create new server state, opening the store named by `config.store_uri`.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store = Arc::new(DocumentStore::open(&config.store_uri)?);
        Ok(Self::with_store(config, store))
    }

    /// Create server state around an existing store.
    pub fn with_store(config: ServerConfig, store: Arc<DocumentStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    /// Collection resolver: maps a path segment to a live collection handle.
    pub fn collection(&self, name: &str) -> Collection {
        self.store.collection(name)
    }
}
