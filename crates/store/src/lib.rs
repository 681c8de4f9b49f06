//! # Docgate Store
//!
//! A schemaless document store: named collections of JSON-like documents,
//! each keyed by a store-assigned [`DocumentId`]. Collections need no
//! provisioning; referencing a name yields a usable (possibly empty)
//! [`Collection`] and the first insert brings it into existence.
//!
//! ## Core Features
//!
//! - **Pluggable Backends** through the [`StorageBackend`] trait:
//!   - an in-memory backend for tests and throwaway prototypes
//!   - a redb backend for persistent, on-disk storage (`backend-redb` feature)
//! - **Typed values**: documents hold the closed [`Value`] union rather than
//!   raw JSON, so identifiers keep their type through storage.
//! - **Filters**: [`Filter`] evaluates document-shaped predicates with
//!   equality, comparison, membership and logical operators.
//! - **Compression**: encoded documents are compressed with Zstd by default.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use store::{Document, DocumentStore, Filter, StoreConfig};
//! use serde_json::json;
//!
//! let store = Arc::new(DocumentStore::new(StoreConfig::default()).unwrap());
//! let widgets = store.collection("widgets");
//!
//! let doc = Document::try_from(json!({ "name": "bolt", "qty": 5 })).unwrap();
//! let id = widgets.insert_one(doc).unwrap();
//!
//! let found = widgets.find_one(&id).unwrap().unwrap();
//! assert_eq!(found.get("name").and_then(|v| v.as_str()), Some("bolt"));
//!
//! let filter = Filter::new(Document::try_from(json!({ "qty": 5 })).unwrap()).unwrap();
//! assert_eq!(widgets.find(&filter).unwrap().len(), 1);
//! assert_eq!(widgets.count().unwrap(), 1);
//! ```

mod backend;
mod error;
pub mod filter;
pub mod id;
pub mod value;

#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use backend::{BackendConfig, InMemoryBackend, StorageBackend};
pub use error::StoreError;
pub use filter::Filter;
pub use id::DocumentId;
pub use value::{Document, Value, ID_FIELD};

use std::sync::Arc;
use zstd::{decode_all, encode_all};

/// Compression codec options for stored documents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CompressionCodec {
    /// No compression (useful for debugging with external redb tooling).
    None,
    /// Zstd compression (default, good balance of speed and ratio).
    #[default]
    Zstd,
}

/// Compression behavior configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Compression level (1-22 for Zstd, where higher = better compression but slower).
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, StoreError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, StoreError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }
}

/// Config for opening a store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    pub compression: CompressionConfig,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }
}

/// The document store: a backend plus the document codec.
///
/// Shared across request handlers behind an `Arc`; every method takes `&self`.
pub struct DocumentStore {
    backend: Box<dyn StorageBackend>,
    cfg: StoreConfig,
}

impl DocumentStore {
    pub fn new(cfg: StoreConfig) -> Result<Self, StoreError> {
        let backend = cfg.backend.build()?;
        tracing::debug!(backend = ?cfg.backend, "document store opened");
        Ok(Self { backend, cfg })
    }

    /// Open a store from a connection string such as `memory://` or `redb:///path/file.redb`.
    pub fn open(uri: &str) -> Result<Self, StoreError> {
        Self::new(StoreConfig::new().with_backend(BackendConfig::from_uri(uri)?))
    }

    /// Wrap an already constructed backend.
    pub fn with_backend(backend: Box<dyn StorageBackend>, compression: CompressionConfig) -> Self {
        Self {
            backend,
            cfg: StoreConfig {
                backend: BackendConfig::default(),
                compression,
            },
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    /// Resolve a collection name to a handle. Never fails and has no side
    /// effect; the collection is materialized by its first insert.
    pub fn collection(self: &Arc<Self>, name: &str) -> Collection {
        Collection {
            name: name.to_string(),
            store: Arc::clone(self),
        }
    }

    /// Names of collections that currently hold documents.
    pub fn collections(&self) -> Result<Vec<String>, StoreError> {
        self.backend.collections()
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.backend.flush()
    }

    fn encode(&self, doc: &Document) -> Result<Vec<u8>, StoreError> {
        let bytes = serde_json::to_vec(&doc.to_extended_json())
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        self.cfg.compression.compress(&bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Document, StoreError> {
        let raw = self.cfg.compression.decompress(bytes)?;
        let json: serde_json::Value =
            serde_json::from_slice(&raw).map_err(|e| StoreError::Decode(e.to_string()))?;
        Document::try_from(json).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

/// Handle to one named collection of a [`DocumentStore`].
#[derive(Clone)]
pub struct Collection {
    name: String,
    store: Arc<DocumentStore>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).finish()
    }
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a document and return its identifier.
    ///
    /// A fresh identifier is assigned unless the document already carries an
    /// `_id` that is an identifier (or its hex string); reusing a taken
    /// identifier fails with [`StoreError::DuplicateKey`].
    pub fn insert_one(&self, mut doc: Document) -> Result<DocumentId, StoreError> {
        let id = match doc.remove(ID_FIELD) {
            None => DocumentId::new(),
            Some(value) => value.as_id().ok_or_else(|| {
                StoreError::InvalidDocument(format!(
                    "_id must be a 24-character hex identifier, got {}",
                    value.type_name()
                ))
            })?,
        };
        check_field_names(&doc)?;

        let doc = doc.with_id(id);
        let bytes = self.store.encode(&doc)?;
        if !self.store.backend.insert(&self.name, &id.to_hex(), &bytes)? {
            return Err(StoreError::DuplicateKey(id.to_hex()));
        }
        tracing::debug!(collection = %self.name, id = %id, "document inserted");
        Ok(id)
    }

    /// All documents matching `filter`, in store order.
    pub fn find(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let mut matched = Vec::new();
        self.store.backend.scan(&self.name, &mut |bytes| {
            let doc = self.store.decode(bytes)?;
            if filter.matches(&doc) {
                matched.push(doc);
            }
            Ok(())
        })?;
        Ok(matched)
    }

    pub fn find_all(&self) -> Result<Vec<Document>, StoreError> {
        self.find(&Filter::all())
    }

    pub fn find_one(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        self.store
            .backend
            .get(&self.name, &id.to_hex())?
            .map(|bytes| self.store.decode(&bytes))
            .transpose()
    }

    /// Whether a document with this identifier exists, without decoding it.
    pub fn contains(&self, id: &DocumentId) -> Result<bool, StoreError> {
        Ok(self.store.backend.get(&self.name, &id.to_hex())?.is_some())
    }

    /// Replace the document stored under `id`. The stored `_id` is always
    /// `id`, whatever `doc` carries. Returns `false` if nothing was stored
    /// under `id`.
    pub fn replace_one(&self, id: &DocumentId, mut doc: Document) -> Result<bool, StoreError> {
        if let Some(other) = doc.remove(ID_FIELD) {
            if other != Value::Id(*id) {
                tracing::debug!(
                    collection = %self.name,
                    id = %id,
                    "ignoring _id in replacement document"
                );
            }
        }
        check_field_names(&doc)?;

        let bytes = self.store.encode(&doc.with_id(*id))?;
        let replaced = self.store.backend.replace(&self.name, &id.to_hex(), &bytes)?;
        tracing::debug!(collection = %self.name, id = %id, replaced, "document replaced");
        Ok(replaced)
    }

    /// Delete by identifier. Returns `false` if nothing was stored under `id`.
    pub fn delete_one(&self, id: &DocumentId) -> Result<bool, StoreError> {
        let deleted = self.store.backend.delete(&self.name, &id.to_hex())?;
        tracing::debug!(collection = %self.name, id = %id, deleted, "document deleted");
        Ok(deleted)
    }

    /// Number of documents, answered by the backend without decoding.
    pub fn count(&self) -> Result<u64, StoreError> {
        self.store.backend.count(&self.name)
    }
}

fn check_field_names(doc: &Document) -> Result<(), StoreError> {
    match doc.keys().find(|k| k.is_empty() || k.starts_with('$')) {
        Some(key) => Err(StoreError::InvalidDocument(format!(
            "field name '{key}' is not allowed, names must be nonempty and not start with '$'"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> Arc<DocumentStore> {
        Arc::new(DocumentStore::new(StoreConfig::default()).unwrap())
    }

    fn doc(value: serde_json::Value) -> Document {
        Document::try_from(value).unwrap()
    }

    #[test]
    fn insert_then_find_one_returns_document_plus_id() {
        let widgets = store().collection("widgets");
        let id = widgets.insert_one(doc(json!({ "name": "bolt", "qty": 5 }))).unwrap();

        let found = widgets.find_one(&id).unwrap().unwrap();
        assert_eq!(
            found.to_json(),
            json!({ "_id": id.to_hex(), "name": "bolt", "qty": 5 })
        );
        assert_eq!(found.id(), Some(id));
    }

    #[test]
    fn resolving_an_unknown_collection_is_an_empty_collection() {
        let store = store();
        let ghosts = store.collection("ghosts");
        assert_eq!(ghosts.count().unwrap(), 0);
        assert!(ghosts.find_all().unwrap().is_empty());
        assert!(store.collections().unwrap().is_empty());

        ghosts.insert_one(doc(json!({ "boo": true }))).unwrap();
        assert_eq!(store.collections().unwrap(), vec!["ghosts".to_string()]);
    }

    #[test]
    fn collections_are_isolated() {
        let store = store();
        let widgets = store.collection("widgets");
        let gadgets = store.collection("gadgets");
        let id = widgets.insert_one(doc(json!({ "n": 1 }))).unwrap();

        assert!(gadgets.find_one(&id).unwrap().is_none());
        assert_eq!(gadgets.count().unwrap(), 0);
        assert_eq!(widgets.count().unwrap(), 1);
    }

    #[test]
    fn find_lists_in_insertion_order() {
        let widgets = store().collection("widgets");
        for n in 0..20 {
            widgets.insert_one(doc(json!({ "n": n }))).unwrap();
        }
        let ns: Vec<i64> = widgets
            .find_all()
            .unwrap()
            .iter()
            .filter_map(|d| match d.get("n") {
                Some(Value::Int(n)) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(ns, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn large_unsigned_integers_survive_storage() {
        let nums = store().collection("nums");
        let id = nums
            .insert_one(doc(json!({ "n": 18_446_744_073_709_551_615_u64 })))
            .unwrap();

        let found = nums.find_one(&id).unwrap().unwrap();
        assert_eq!(
            found.to_json(),
            json!({ "_id": id.to_hex(), "n": 18_446_744_073_709_551_615_u64 })
        );
    }

    #[test]
    fn count_equals_find_all_len() {
        let widgets = store().collection("widgets");
        for n in 0..7 {
            widgets.insert_one(doc(json!({ "n": n }))).unwrap();
        }
        assert_eq!(widgets.count().unwrap(), 7);
        assert_eq!(widgets.find_all().unwrap().len(), 7);
        assert_eq!(widgets.find(&Filter::all()).unwrap(), widgets.find_all().unwrap());
    }

    #[test]
    fn client_supplied_id_is_honoured_and_unique() {
        let widgets = store().collection("widgets");
        let hex = "65a1b2c3d4e5f60718293a4b";
        let id = widgets.insert_one(doc(json!({ "_id": hex, "a": 1 }))).unwrap();
        assert_eq!(id.to_hex(), hex);

        let err = widgets.insert_one(doc(json!({ "_id": hex, "a": 2 }))).unwrap_err();
        assert_eq!(err, StoreError::DuplicateKey(hex.to_string()));
        assert_eq!(widgets.count().unwrap(), 1);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        let widgets = store().collection("widgets");
        for bad in [
            json!({ "_id": "not-an-id" }),
            json!({ "_id": 42 }),
            json!({ "$set": { "a": 1 } }),
            json!({ "": 1 }),
        ] {
            let err = widgets.insert_one(doc(bad.clone())).unwrap_err();
            assert!(matches!(err, StoreError::InvalidDocument(_)), "{bad}: {err}");
        }
        assert_eq!(widgets.count().unwrap(), 0);
    }

    #[test]
    fn replace_keeps_original_identifier() {
        let widgets = store().collection("widgets");
        let id = widgets.insert_one(doc(json!({ "name": "bolt" }))).unwrap();
        let other = DocumentId::new();

        let replaced = widgets
            .replace_one(&id, doc(json!({ "_id": other.to_hex(), "name": "nut" })))
            .unwrap();
        assert!(replaced);

        let found = widgets.find_one(&id).unwrap().unwrap();
        assert_eq!(found.id(), Some(id));
        assert_eq!(found.get("name"), Some(&Value::from("nut")));
        assert!(widgets.find_one(&other).unwrap().is_none());
    }

    #[test]
    fn replace_and_delete_of_missing_ids_report_false() {
        let widgets = store().collection("widgets");
        let id = DocumentId::new();
        assert!(!widgets.replace_one(&id, doc(json!({ "a": 1 }))).unwrap());
        assert!(!widgets.delete_one(&id).unwrap());
        assert_eq!(widgets.count().unwrap(), 0);
    }

    #[test]
    fn delete_then_find_one_is_none() {
        let widgets = store().collection("widgets");
        let id = widgets.insert_one(doc(json!({ "a": 1 }))).unwrap();
        assert!(widgets.contains(&id).unwrap());
        assert!(widgets.delete_one(&id).unwrap());
        assert!(!widgets.contains(&id).unwrap());
        assert!(widgets.find_one(&id).unwrap().is_none());
    }

    #[test]
    fn uncompressed_codec_round_trips() {
        let config = StoreConfig::new()
            .with_compression(CompressionConfig::new(CompressionCodec::None, 0));
        let store = Arc::new(DocumentStore::new(config).unwrap());
        let widgets = store.collection("widgets");
        let id = widgets
            .insert_one(doc(json!({ "nested": { "list": [1, "two", null, { "$oid": "65a1b2c3d4e5f60718293a4b" }] } })))
            .unwrap();
        let found = widgets.find_one(&id).unwrap().unwrap();
        assert!(matches!(
            found.get_path("nested.list.3"),
            Some(Value::Id(_))
        ));
    }

    #[test]
    fn open_parses_connection_strings() {
        assert!(DocumentStore::open("memory://").is_ok());
        assert!(matches!(
            DocumentStore::open("ftp://nowhere"),
            Err(StoreError::Config(_))
        ));
    }

    #[cfg(feature = "backend-redb")]
    #[test]
    fn redb_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.redb");
        let store = Arc::new(DocumentStore::open(&format!("redb://{}", path.display())).unwrap());
        let widgets = store.collection("widgets");
        let id = widgets.insert_one(doc(json!({ "name": "bolt", "qty": 5 }))).unwrap();

        let mut current = widgets.find_one(&id).unwrap().unwrap();
        current.merge(doc(json!({ "qty": 9 })));
        assert!(widgets.replace_one(&id, current).unwrap());

        let found = widgets.find_one(&id).unwrap().unwrap();
        assert_eq!(found.to_json(), json!({ "_id": id.to_hex(), "name": "bolt", "qty": 9 }));
        assert_eq!(widgets.count().unwrap(), 1);
    }
}
